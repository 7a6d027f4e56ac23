use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    AccountChanges, AccountCredentials, AccountProfile, AccountStore, NewAccount,
    SubscriptionState,
};
use crate::error::AppError;

const PROFILE_COLUMNS: &str = "id, user_name, email, full_name, created_at, updated_at";

/// Postgres-backed credential store.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[tracing::instrument(name = "insert_account", skip_all, fields(user_name = %account.user_name))]
    async fn insert_account(&self, account: NewAccount) -> Result<AccountProfile, AppError> {
        let now = Utc::now();
        let profile = sqlx::query_as::<_, AccountProfile>(&format!(
            r#"
            INSERT INTO users (id, user_name, email, full_name, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&account.user_name)
        .bind(&account.email)
        .bind(&account.full_name)
        .bind(&account.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<AccountProfile>, AppError> {
        let profile = sqlx::query_as::<_, AccountProfile>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_credentials(&self, id: Uuid) -> Result<Option<AccountCredentials>, AppError> {
        let credentials = sqlx::query_as::<_, AccountCredentials>(
            "SELECT id, password_hash, refresh_token_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credentials)
    }

    async fn find_credentials_by_login(
        &self,
        user_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<AccountCredentials>, AppError> {
        let credentials = sqlx::query_as::<_, AccountCredentials>(
            r#"
            SELECT id, password_hash, refresh_token_hash
            FROM users
            WHERE ($1::TEXT IS NOT NULL AND user_name = $1)
               OR ($2::TEXT IS NOT NULL AND email = $2)
            LIMIT 1
            "#,
        )
        .bind(user_name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credentials)
    }

    async fn set_refresh_token(&self, id: Uuid, token_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET refresh_token_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("account"));
        }
        Ok(())
    }

    async fn clear_refresh_token(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET refresh_token_hash = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("account"));
        }
        Ok(())
    }

    async fn update_details(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<AccountProfile>, AppError> {
        let profile = sqlx::query_as::<_, AccountProfile>(&format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(changes.full_name)
        .bind(changes.email)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    #[tracing::instrument(name = "toggle_subscription", skip(self))]
    async fn toggle_subscription(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> Result<SubscriptionState, AppError> {
        let mut transaction = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(&mut transaction)
        .await?;

        let state = if removed.rows_affected() > 0 {
            SubscriptionState::Unsubscribed
        } else {
            // A concurrent toggle may have inserted first; the unique pair wins.
            sqlx::query(
                r#"
                INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (subscriber_id, channel_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(subscriber_id)
            .bind(channel_id)
            .bind(Utc::now())
            .execute(&mut transaction)
            .await?;
            SubscriptionState::Subscribed
        };

        transaction.commit().await?;
        Ok(state)
    }
}
