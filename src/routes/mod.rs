mod health_check;
mod subscriptions;
mod users;

use actix_web::http::StatusCode;
use serde::Serialize;

pub use health_check::health_check;
pub use subscriptions::toggle_subscription;
pub use users::{
    change_password, current_user, login, logout, refresh_access_token, register, update_account,
};

/// Envelope wrapped around every successful JSON response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
        }
    }
}
