/// JWT Token Issuing and Verification
///
/// Access and refresh tokens are both HS256 JWTs carrying the account id.
/// They differ only in secret and lifetime, both taken from `JwtSettings`.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret(self, config: &JwtSettings) -> &str {
        match self {
            TokenKind::Access => &config.access_token_secret,
            TokenKind::Refresh => &config.refresh_token_secret,
        }
    }

    fn expiry(self, config: &JwtSettings) -> i64 {
        match self {
            TokenKind::Access => config.access_token_expiry,
            TokenKind::Refresh => config.refresh_token_expiry,
        }
    }
}

/// Verification failure. Callers at the HTTP edge collapse both variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed or its signature does not match")]
    Invalid,
    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Sign a single token of `kind` for `account_id`
///
/// # Errors
/// Returns an internal error if the secret is not configured or signing fails
pub fn issue_token(
    account_id: &Uuid,
    kind: TokenKind,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let secret = kind.secret(config);
    if secret.is_empty() {
        return Err(AppError::Internal(format!("{:?} token secret is not configured", kind)));
    }

    let claims = Claims::new(*account_id, kind.expiry(config), config.issuer.clone());

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Issue a fresh access/refresh pair. Persisting the refresh token is the
/// caller's job.
pub fn issue_token_pair(account_id: &Uuid, config: &JwtSettings) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access_token: issue_token(account_id, TokenKind::Access, config)?,
        refresh_token: issue_token(account_id, TokenKind::Refresh, config)?,
    })
}

/// Check signature, issuer and expiry of `token` against `secret`
pub fn decode_claims(token: &str, secret: &str, issuer: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => {
                tracing::debug!(error = %e, "JWT validation error");
                TokenError::Invalid
            }
        })
}

/// Verify a token of `kind` and recover the account id it was issued for
pub fn verify_token(token: &str, kind: TokenKind, config: &JwtSettings) -> Result<Uuid, TokenError> {
    let claims = decode_claims(token, kind.secret(config), &config.issuer)?;
    claims.account_id().map_err(|_| TokenError::Invalid)
}
