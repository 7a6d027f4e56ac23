use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, ErrorContext, ValidationError};
use crate::routes::ApiResponse;
use crate::storage::{AccountProfile, AccountStore, SubscriptionState};

#[derive(Serialize)]
pub struct SubscriptionData {
    pub subscribed: bool,
}

/// POST /api/v1/subscriptions/channel/{channel_id}
///
/// Subscribes the caller to the channel, or unsubscribes if already
/// subscribed. The swap happens inside the store in one step.
///
/// # Errors
/// - 400: malformed channel id, or the caller's own channel
/// - 404: no such channel
pub async fn toggle_subscription(
    account: web::ReqData<AccountProfile>,
    path: web::Path<String>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("toggle_subscription").with_account_id(account.id);

    let channel_id = Uuid::parse_str(path.trim())
        .map_err(|_| ValidationError::InvalidFormat("channelId".to_string()))?;
    if channel_id == account.id {
        return Err(ValidationError::Rejected("cannot subscribe to your own channel".to_string()).into());
    }

    if store.find_profile(channel_id).await?.is_none() {
        return Err(context.record(AppError::not_found("channel")));
    }

    let state = store.toggle_subscription(account.id, channel_id).await?;
    let (subscribed, message) = match state {
        SubscriptionState::Subscribed => (true, "Channel subscribed"),
        SubscriptionState::Unsubscribed => (false, "Channel unsubscribed"),
    };

    tracing::info!(
        request_id = %context.request_id,
        account_id = %account.id,
        channel_id = %channel_id,
        subscribed,
        "Subscription toggled"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        StatusCode::OK,
        SubscriptionData { subscribed },
        message,
    )))
}
