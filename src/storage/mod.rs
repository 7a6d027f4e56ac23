/// Account persistence
///
/// `AccountStore` is the only way the rest of the crate touches stored
/// accounts. The refresh-token field is owned here: it is written by
/// `set_refresh_token` / `clear_refresh_token` and read back only through
/// `AccountCredentials`, never through the profile projection.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Public projection of an account: everything except secrets.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Secret half of an account record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountCredentials {
    pub id: Uuid,
    pub password_hash: String,
    /// Digest of the current refresh token; `None` when logged out
    pub refresh_token_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Subscribed,
    Unsubscribed,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with a conflict if the user name or email is taken.
    async fn insert_account(&self, account: NewAccount) -> Result<AccountProfile, AppError>;

    async fn find_profile(&self, id: Uuid) -> Result<Option<AccountProfile>, AppError>;

    async fn find_credentials(&self, id: Uuid) -> Result<Option<AccountCredentials>, AppError>;

    /// Looks an account up by user name or email, whichever is given.
    async fn find_credentials_by_login(
        &self,
        user_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<AccountCredentials>, AppError>;

    /// Single-record overwrite of the stored refresh token digest.
    async fn set_refresh_token(&self, id: Uuid, token_hash: &str) -> Result<(), AppError>;

    /// Unsets the stored refresh token.
    async fn clear_refresh_token(&self, id: Uuid) -> Result<(), AppError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;

    async fn update_details(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<AccountProfile>, AppError>;

    /// Deletes the (subscriber, channel) subscription if present, otherwise
    /// creates it. Atomic with respect to concurrent toggles.
    async fn toggle_subscription(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> Result<SubscriptionState, AppError>;
}
