/// Middleware module
///
/// Session gating for protected scopes and per-request logging.

mod request_logger;
mod session_middleware;

pub use request_logger::RequestLogger;
pub use session_middleware::{
    extract_access_token, SessionMiddleware, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
