/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. Which kind a token is follows
/// from the secret it was signed with, not from a claim.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
    /// Unique token id; two tokens minted in the same second still differ
    pub jti: String,
}

impl Claims {
    /// Create claims for `account_id` expiring `expiry_seconds` from now
    pub fn new(account_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: account_id.to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract account ID from claims
    ///
    /// # Errors
    /// Returns error if the subject is not a valid UUID
    pub fn account_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }
}
