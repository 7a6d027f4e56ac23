#![allow(dead_code)]

use actix_web::web;
use reqwest::header::SET_COOKIE;
use reqwest::Response;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use videotube::configuration::JwtSettings;
use videotube::startup::run;
use videotube::storage::{AccountStore, MemoryAccountStore};

pub const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub jwt: JwtSettings,
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        access_token_secret: "integration-access-secret".to_string(),
        access_token_expiry: 900,
        refresh_token_secret: "integration-refresh-secret".to_string(),
        refresh_token_expiry: 864000,
        issuer: "videotube-test".to_string(),
    }
}

pub fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store: Arc<dyn AccountStore> = Arc::new(MemoryAccountStore::new());
    let jwt = jwt_settings();
    let server = run(listener, web::Data::from(store), jwt.clone()).expect("Failed to create server");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        jwt,
    }
}

pub struct Session {
    pub account_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, user_name: &str) -> Response {
        self.post_json(
            "/users/register",
            &json!({
                "fullName": "Test User",
                "email": format!("{}@example.com", user_name),
                "userName": user_name,
                "password": PASSWORD,
            }),
        )
        .await
    }

    pub async fn login(&self, user_name: &str, password: &str) -> Response {
        self.post_json(
            "/users/login",
            &json!({ "userName": user_name, "password": password }),
        )
        .await
    }

    /// Registers and logs in `user_name`, returning the issued tokens.
    pub async fn signed_in(&self, user_name: &str) -> Session {
        assert_eq!(201, self.register(user_name).await.status().as_u16());
        let response = self.login(user_name, PASSWORD).await;
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.unwrap();
        Session {
            account_id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
            access_token: body["data"]["accessToken"].as_str().unwrap().to_string(),
            refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_string(),
        }
    }

    pub async fn refresh_with_body(&self, refresh_token: &str) -> Response {
        self.post_json("/users/refresh-token", &json!({ "refreshToken": refresh_token }))
            .await
    }

    pub async fn get_with_bearer(&self, path: &str, token: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

/// All `Set-Cookie` header values on a response.
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn cookie_named<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    let prefix = format!("{}=", name);
    cookies.iter().find(|c| c.starts_with(&prefix))
}

pub async fn error_code(response: Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse error body");
    body["code"].as_str().unwrap_or_default().to_string()
}
