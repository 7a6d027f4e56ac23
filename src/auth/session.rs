/// Session lifecycle: login, request authentication, refresh rotation, logout.
///
/// Access tokens are purely cryptographic. Refresh tokens are additionally
/// pinned to the account record: the store keeps the SHA-256 digest of the
/// one refresh token currently allowed, so overwriting it (rotation) or
/// unsetting it (logout) revokes every older refresh token at once.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::jwt::{issue_token_pair, verify_token, TokenKind, TokenPair};
use crate::configuration::JwtSettings;
use crate::error::{AppError, DatabaseError};
use crate::storage::{AccountProfile, AccountStore};

/// Digest under which a refresh token is stored. Never persist the token itself.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issue a token pair for `account_id` and make its refresh token the only
/// valid one for the account.
#[tracing::instrument(name = "start_session", skip(store, config))]
pub async fn start_session(
    store: &dyn AccountStore,
    account_id: Uuid,
    config: &JwtSettings,
) -> Result<TokenPair, AppError> {
    let pair = issue_token_pair(&account_id, config)?;
    store
        .set_refresh_token(account_id, &token_digest(&pair.refresh_token))
        .await?;

    Ok(pair)
}

/// Resolve an access token to the account it belongs to.
///
/// Malformed, forged and expired tokens, as well as tokens for accounts that
/// no longer exist, all come back as `Unauthorized`.
pub async fn authenticate(
    store: &dyn AccountStore,
    access_token: &str,
    config: &JwtSettings,
) -> Result<AccountProfile, AppError> {
    let account_id = verify_token(access_token, TokenKind::Access, config).map_err(|e| {
        tracing::debug!(reason = %e, "Access token rejected");
        AppError::unauthorized()
    })?;

    store.find_profile(account_id).await?.ok_or_else(|| {
        tracing::debug!(account_id = %account_id, "Access token for unknown account");
        AppError::unauthorized()
    })
}

/// Rotate a session: verify `incoming` and, if it is still the account's
/// current refresh token, replace it with a freshly issued pair.
///
/// The stored digest is overwritten in one update. Two refreshes racing on the
/// same token can both pass the comparison; the later write wins and the
/// other caller's refresh token is orphaned.
#[tracing::instrument(name = "refresh_session", skip_all, fields(account_id = tracing::field::Empty))]
pub async fn refresh_session(
    store: &dyn AccountStore,
    incoming: &str,
    config: &JwtSettings,
) -> Result<(Uuid, TokenPair), AppError> {
    let account_id = verify_token(incoming, TokenKind::Refresh, config).map_err(|e| {
        tracing::debug!(reason = %e, "Refresh token rejected");
        AppError::unauthorized()
    })?;
    tracing::Span::current().record("account_id", tracing::field::display(account_id));

    let credentials = store
        .find_credentials(account_id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    match credentials.refresh_token_hash {
        Some(stored) if stored == token_digest(incoming) => {}
        Some(_) => {
            tracing::warn!("Superseded refresh token presented");
            return Err(AppError::invalid_token());
        }
        None => {
            tracing::warn!("Refresh attempted on a logged-out account");
            return Err(AppError::invalid_token());
        }
    }

    let pair = issue_token_pair(&account_id, config)?;
    store
        .set_refresh_token(account_id, &token_digest(&pair.refresh_token))
        .await
        .map_err(|e| match e {
            // Account deleted between the lookup and the write
            AppError::Database(DatabaseError::NotFound(_)) => AppError::unauthorized(),
            other => other,
        })?;

    Ok((account_id, pair))
}

/// Revoke the account's refresh token. Access tokens already handed out stay
/// valid until they expire.
#[tracing::instrument(name = "end_session", skip(store))]
pub async fn end_session(store: &dyn AccountStore, account_id: Uuid) -> Result<(), AppError> {
    store.clear_refresh_token(account_id).await
}
