use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    AccountChanges, AccountCredentials, AccountProfile, AccountStore, NewAccount,
    SubscriptionState,
};
use crate::error::AppError;

struct StoredAccount {
    profile: AccountProfile,
    password_hash: String,
    refresh_token_hash: Option<String>,
}

impl StoredAccount {
    fn credentials(&self) -> AccountCredentials {
        AccountCredentials {
            id: self.profile.id,
            password_hash: self.password_hash.clone(),
            refresh_token_hash: self.refresh_token_hash.clone(),
        }
    }
}

#[derive(Default)]
struct State {
    accounts: HashMap<Uuid, StoredAccount>,
    subscriptions: HashSet<(Uuid, Uuid)>,
}

/// In-process store with the same semantics as `PgAccountStore`.
///
/// Every operation runs under one lock, so each is a single atomic step.
#[derive(Default)]
pub struct MemoryAccountStore {
    state: Mutex<State>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("account store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert_account(&self, account: NewAccount) -> Result<AccountProfile, AppError> {
        let mut state = self.state()?;

        let taken = state
            .accounts
            .values()
            .any(|a| a.profile.user_name == account.user_name || a.profile.email == account.email);
        if taken {
            return Err(AppError::conflict("User name or email already exists"));
        }

        let now = Utc::now();
        let profile = AccountProfile {
            id: Uuid::new_v4(),
            user_name: account.user_name,
            email: account.email,
            full_name: account.full_name,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(
            profile.id,
            StoredAccount {
                profile: profile.clone(),
                password_hash: account.password_hash,
                refresh_token_hash: None,
            },
        );

        Ok(profile)
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<AccountProfile>, AppError> {
        Ok(self.state()?.accounts.get(&id).map(|a| a.profile.clone()))
    }

    async fn find_credentials(&self, id: Uuid) -> Result<Option<AccountCredentials>, AppError> {
        Ok(self.state()?.accounts.get(&id).map(StoredAccount::credentials))
    }

    async fn find_credentials_by_login(
        &self,
        user_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<AccountCredentials>, AppError> {
        let state = self.state()?;
        let found = state.accounts.values().find(|a| {
            user_name == Some(a.profile.user_name.as_str()) || email == Some(a.profile.email.as_str())
        });

        Ok(found.map(StoredAccount::credentials))
    }

    async fn set_refresh_token(&self, id: Uuid, token_hash: &str) -> Result<(), AppError> {
        let mut state = self.state()?;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("account"))?;

        account.refresh_token_hash = Some(token_hash.to_string());
        Ok(())
    }

    async fn clear_refresh_token(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state()?;
        if let Some(account) = state.accounts.get_mut(&id) {
            account.refresh_token_hash = None;
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut state = self.state()?;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("account"))?;

        account.password_hash = password_hash.to_string();
        account.profile.updated_at = Utc::now();
        Ok(())
    }

    async fn update_details(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<AccountProfile>, AppError> {
        let mut state = self.state()?;

        if let Some(email) = &changes.email {
            let taken = state
                .accounts
                .values()
                .any(|a| a.profile.id != id && &a.profile.email == email);
            if taken {
                return Err(AppError::conflict("User name or email already exists"));
            }
        }

        let Some(account) = state.accounts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(full_name) = changes.full_name {
            account.profile.full_name = full_name;
        }
        if let Some(email) = changes.email {
            account.profile.email = email;
        }
        account.profile.updated_at = Utc::now();

        Ok(Some(account.profile.clone()))
    }

    async fn toggle_subscription(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> Result<SubscriptionState, AppError> {
        let mut state = self.state()?;
        let key = (subscriber_id, channel_id);

        if state.subscriptions.remove(&key) {
            Ok(SubscriptionState::Unsubscribed)
        } else {
            state.subscriptions.insert(key);
            Ok(SubscriptionState::Subscribed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(user_name: &str, email: &str) -> NewAccount {
        NewAccount {
            user_name: user_name.to_string(),
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_user_name_or_email_conflicts() {
        let store = MemoryAccountStore::new();
        store.insert_account(new_account("alice", "alice@example.com")).await.unwrap();

        let same_name = store.insert_account(new_account("alice", "other@example.com")).await;
        let same_email = store.insert_account(new_account("bob", "alice@example.com")).await;

        assert!(same_name.is_err());
        assert!(same_email.is_err());
    }

    #[tokio::test]
    async fn login_lookup_by_either_identifier() {
        let store = MemoryAccountStore::new();
        let profile = store.insert_account(new_account("alice", "alice@example.com")).await.unwrap();

        let by_name = store.find_credentials_by_login(Some("alice"), None).await.unwrap();
        let by_email = store
            .find_credentials_by_login(None, Some("alice@example.com"))
            .await
            .unwrap();
        let missing = store.find_credentials_by_login(Some("bob"), None).await.unwrap();

        assert_eq!(by_name.unwrap().id, profile.id);
        assert_eq!(by_email.unwrap().id, profile.id);
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn refresh_token_set_and_clear() {
        let store = MemoryAccountStore::new();
        let profile = store.insert_account(new_account("alice", "alice@example.com")).await.unwrap();

        store.set_refresh_token(profile.id, "digest-1").await.unwrap();
        store.set_refresh_token(profile.id, "digest-2").await.unwrap();
        let stored = store.find_credentials(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token_hash.as_deref(), Some("digest-2"));

        store.clear_refresh_token(profile.id).await.unwrap();
        let stored = store.find_credentials(profile.id).await.unwrap().unwrap();
        assert!(stored.refresh_token_hash.is_none());
    }

    #[tokio::test]
    async fn set_refresh_token_for_unknown_account_fails() {
        let store = MemoryAccountStore::new();
        assert!(store.set_refresh_token(Uuid::new_v4(), "digest").await.is_err());
    }

    #[tokio::test]
    async fn toggle_alternates() {
        let store = MemoryAccountStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(store.toggle_subscription(a, b).await.unwrap(), SubscriptionState::Subscribed);
        assert_eq!(store.toggle_subscription(a, b).await.unwrap(), SubscriptionState::Unsubscribed);
        assert_eq!(store.toggle_subscription(a, b).await.unwrap(), SubscriptionState::Subscribed);
    }

    #[tokio::test]
    async fn update_details_rejects_taken_email() {
        let store = MemoryAccountStore::new();
        let alice = store.insert_account(new_account("alice", "alice@example.com")).await.unwrap();
        store.insert_account(new_account("bob", "bob@example.com")).await.unwrap();

        let changes = AccountChanges {
            full_name: None,
            email: Some("bob@example.com".to_string()),
        };
        assert!(store.update_details(alice.id, changes).await.is_err());
    }
}
