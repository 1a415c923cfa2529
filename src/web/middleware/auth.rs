//! Session cookie extractors.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::{check_permission, Action, Session, SESSION_DURATION_SECS};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::StageboxError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";

/// Build the session cookie for a freshly created session.
pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_DURATION_SECS as i64))
        .build()
}

/// Cookie used to clear the session cookie on logout.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Token carried by the request, if any.
pub fn session_token(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

fn resolve(parts: &Parts, state: &AppState) -> Option<Session> {
    let token = session_token(parts)?;
    state.sessions.resolve(&token)
}

fn require(parts: &Parts, state: &AppState, action: Action) -> Result<Session, ApiError> {
    let session = resolve(parts, state);
    if let Err(e) = check_permission(session.as_ref(), action) {
        tracing::debug!("{} {} refused: {}", parts.method, parts.uri.path(), e);
        return Err(StageboxError::from(e).into());
    }
    session.ok_or_else(|| ApiError::unauthorized("Login required"))
}

/// The session of the caller, or `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(resolve(parts, state)))
    }
}

/// Any logged-in user; rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Action::Upload).map(RequireSession)
    }
}

/// An administrator; rejects with 401 when anonymous and 403 otherwise.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Session);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Action::ManageFiles).map(RequireAdmin)
    }
}
