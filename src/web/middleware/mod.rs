//! Middleware and request extractors.

pub mod auth;
pub mod security;

pub use auth::{
    removal_cookie, session_cookie, session_token, CurrentSession, RequireAdmin, RequireSession,
    SESSION_COOKIE,
};
pub use security::security_headers;
