/// Authentication module
///
/// Token issuing/verification, password hashing, and the session lifecycle
/// built on top of them.

mod claims;
mod jwt;
mod password;
mod session;

pub use claims::Claims;
pub use jwt::{decode_claims, issue_token, issue_token_pair, verify_token, TokenError, TokenKind, TokenPair};
pub use password::{
    hash_password, hash_password_blocking, validate_password_strength, verify_password,
    verify_password_against_dummy, verify_password_blocking,
};
pub use session::{authenticate, end_session, refresh_session, start_session, token_digest};
