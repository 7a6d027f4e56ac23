/// Account Routes
///
/// Registration, login, logout, token refresh, and the signed-in user's own
/// account. Login and refresh hand the token pair back twice: as httpOnly
/// secure cookies and in the JSON body for clients that cannot read cookies.

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    end_session, hash_password_blocking, refresh_session, start_session,
    verify_password_against_dummy, verify_password_blocking, TokenPair,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::routes::ApiResponse;
use crate::storage::{AccountChanges, AccountProfile, AccountStore, NewAccount};
use crate::validators::{is_valid_email, is_valid_full_name, is_valid_user_name, required};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: AccountProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .finish()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new());
    cookie.make_removal();
    cookie
}

fn with_session_cookies(status: StatusCode, pair: &TokenPair) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::build(status);
    builder
        .cookie(session_cookie(ACCESS_TOKEN_COOKIE, pair.access_token.clone()))
        .cookie(session_cookie(REFRESH_TOKEN_COOKIE, pair.refresh_token.clone()));
    builder
}

/// POST /api/v1/users/register
///
/// # Errors
/// - 400: a field is missing or invalid, or the password is too weak
/// - 409: user name or email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");
    let form = form.into_inner();

    let full_name = is_valid_full_name(required(form.full_name.as_deref(), "fullName")?)?;
    let email = is_valid_email(required(form.email.as_deref(), "email")?)?;
    let user_name = is_valid_user_name(required(form.user_name.as_deref(), "userName")?)?;
    let password = required(form.password.as_deref(), "password")?.to_string();

    let password_hash = hash_password_blocking(password).await?;

    let profile = store
        .insert_account(NewAccount {
            user_name,
            email,
            full_name,
            password_hash,
        })
        .await
        .map_err(|e| context.record(e))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %profile.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(ApiResponse::new(
        StatusCode::CREATED,
        profile,
        "User registered successfully",
    )))
}

/// POST /api/v1/users/login
///
/// Accepts `userName` or `email` plus `password`. An unknown account and a
/// wrong password produce the same 401 after the same bcrypt work, so the
/// endpoint cannot be used to tell which accounts exist.
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn AccountStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let form = form.into_inner();

    let user_name = form
        .user_name
        .as_deref()
        .map(|u| u.trim().to_lowercase())
        .filter(|u| !u.is_empty());
    let email = form
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    if user_name.is_none() && email.is_none() {
        return Err(ValidationError::EmptyField("userName or email".to_string()).into());
    }
    let password = required(form.password.as_deref(), "password")?.to_string();

    let credentials = match store
        .find_credentials_by_login(user_name.as_deref(), email.as_deref())
        .await?
    {
        Some(credentials) => credentials,
        None => {
            verify_password_against_dummy(password).await?;
            return Err(context.record(AuthError::InvalidCredentials.into()));
        }
    };

    if !verify_password_blocking(password, credentials.password_hash).await? {
        return Err(context
            .with_account_id(credentials.id)
            .record(AuthError::InvalidCredentials.into()));
    }

    let pair = start_session(store.get_ref(), credentials.id, jwt_config.get_ref()).await?;
    let user = store
        .find_profile(credentials.id)
        .await?
        .ok_or_else(|| AppError::Internal("account vanished during login".to_string()))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %user.id,
        "User logged in successfully"
    );

    Ok(with_session_cookies(StatusCode::OK, &pair).json(ApiResponse::new(
        StatusCode::OK,
        LoginData {
            user,
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        },
        "User logged in successfully",
    )))
}

/// POST /api/v1/users/logout
///
/// Revokes the stored refresh token and clears both cookies.
pub async fn logout(
    account: web::ReqData<AccountProfile>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let account = account.into_inner();
    end_session(store.get_ref(), account.id).await?;

    tracing::info!(account_id = %account.id, "User logged out");

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(expired_cookie(REFRESH_TOKEN_COOKIE))
        .json(ApiResponse::new(StatusCode::OK, serde_json::json!({}), "User logged out")))
}

/// POST /api/v1/users/refresh-token
///
/// The refresh token is read from the `refreshToken` cookie, falling back to
/// the `refreshToken` body field. Every success rotates the pair: the token
/// presented here can never be used again.
///
/// # Errors
/// - 401 `UNAUTHORIZED`: missing, malformed or expired token
/// - 401 `INVALID_TOKEN`: token was superseded by a later refresh or a logout
pub async fn refresh_access_token(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    store: web::Data<dyn AccountStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let incoming = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(AppError::unauthorized)?;

    let (account_id, pair) = refresh_session(store.get_ref(), incoming.trim(), jwt_config.get_ref())
        .await
        .map_err(|e| context.record(e))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %account_id,
        "Token refreshed successfully"
    );

    Ok(with_session_cookies(StatusCode::OK, &pair).json(ApiResponse::new(
        StatusCode::OK,
        TokenData {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        },
        "Access token refreshed",
    )))
}

/// POST /api/v1/users/change-password
pub async fn change_password(
    account: web::ReqData<AccountProfile>,
    form: web::Json<ChangePasswordRequest>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let old_password = required(form.old_password.as_deref(), "oldPassword")?.to_string();
    let new_password = required(form.new_password.as_deref(), "newPassword")?.to_string();

    let credentials = store
        .find_credentials(account.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    if !verify_password_blocking(old_password, credentials.password_hash).await? {
        return Err(ValidationError::Rejected("Invalid old password".to_string()).into());
    }

    let password_hash = hash_password_blocking(new_password).await?;
    store.update_password(account.id, &password_hash).await?;

    tracing::info!(account_id = %account.id, "Password changed");

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        serde_json::json!({}),
        "Password changed successfully",
    )))
}

/// GET /api/v1/users/user-data
pub async fn current_user(account: web::ReqData<AccountProfile>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        account.into_inner(),
        "User fetched successfully",
    ))
}

/// PATCH /api/v1/users/update-account
pub async fn update_account(
    account: web::ReqData<AccountProfile>,
    form: web::Json<UpdateAccountRequest>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    if form.full_name.is_none() && form.email.is_none() {
        return Err(ValidationError::EmptyField("fullName or email".to_string()).into());
    }

    let changes = AccountChanges {
        full_name: form.full_name.as_deref().map(is_valid_full_name).transpose()?,
        email: form.email.as_deref().map(is_valid_email).transpose()?,
    };

    let profile = store
        .update_details(account.id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("account"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        profile,
        "Account details updated successfully",
    )))
}
