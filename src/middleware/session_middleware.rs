/// Session Middleware
///
/// Gates a scope behind a valid access token. The token is taken from the
/// `accessToken` cookie, or failing that from `Authorization: Bearer`. On
/// success the caller's `AccountProfile` is inserted into request extensions
/// so handlers can take it as `web::ReqData<AccountProfile>`. Every failure
/// is answered with the same 401 `UNAUTHORIZED` response.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web, Error, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::authenticate;
use crate::configuration::JwtSettings;
use crate::error::AppError;
use crate::storage::AccountStore;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Pulls the access token off a request: cookie first, bearer header second.
pub fn extract_access_token(req: &HttpRequest) -> Option<String> {
    let from_cookie = req
        .cookie(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    from_cookie.or_else(|| {
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

pub struct SessionMiddleware {
    jwt_config: Rc<JwtSettings>,
    store: web::Data<dyn AccountStore>,
}

impl SessionMiddleware {
    pub fn new(jwt_config: JwtSettings, store: web::Data<dyn AccountStore>) -> Self {
        Self {
            jwt_config: Rc::new(jwt_config),
            store,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            jwt_config: Rc::clone(&self.jwt_config),
            store: self.store.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: Rc<JwtSettings>,
    store: web::Data<dyn AccountStore>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let jwt_config = Rc::clone(&self.jwt_config);
        let store = self.store.clone();

        Box::pin(async move {
            let token = extract_access_token(req.request()).ok_or_else(|| {
                tracing::debug!(path = %req.path(), "No access token on request");
                AppError::unauthorized()
            })?;

            let account = authenticate(store.get_ref(), &token, &jwt_config).await?;
            tracing::debug!(account_id = %account.id, "Session authenticated");

            req.extensions_mut().insert(account);
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    #[test]
    fn cookie_wins_over_header() {
        let req = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "from-cookie"))
            .insert_header((AUTHORIZATION, "Bearer from-header"))
            .to_http_request();

        assert_eq!(extract_access_token(&req).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn header_used_without_cookie() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer from-header"))
            .to_http_request();

        assert_eq!(extract_access_token(&req).as_deref(), Some("from-header"));
    }

    #[test]
    fn cleared_cookie_falls_back_to_header() {
        let req = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, ""))
            .insert_header((AUTHORIZATION, "Bearer from-header"))
            .to_http_request();

        assert_eq!(extract_access_token(&req).as_deref(), Some("from-header"));
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert!(extract_access_token(&req).is_none());

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert!(extract_access_token(&req).is_none());

        assert!(extract_access_token(&TestRequest::default().to_http_request()).is_none());
    }
}
