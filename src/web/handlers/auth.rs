//! Login and logout.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::audit::AuditLevel;
use crate::auth::{max_upload_bytes, LimitResult};
use crate::web::dto::{ApiResponse, LoginForm, LoginViewResponse, SessionView};
use crate::web::error::{ApiError, Flash};
use crate::web::handlers::SharedState;
use crate::web::middleware::{removal_cookie, session_cookie, CurrentSession, SESSION_COOKIE};

/// GET /login - Who is logged in on this browser.
pub async fn login_page(
    CurrentSession(session): CurrentSession,
) -> Json<ApiResponse<LoginViewResponse>> {
    Json(ApiResponse::new(LoginViewResponse {
        session: session.as_ref().map(SessionView::from),
    }))
}

/// POST /login - Check credentials and start a session.
pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let username = form.username.trim().to_string();
    if username.is_empty() || form.password.is_empty() {
        return Ok(Flash::error("/login", "Username and password are required").into_response());
    }

    if let LimitResult::Locked(remaining) = state.limiter().check(&username) {
        state.audit(
            AuditLevel::Warning,
            None,
            "login",
            format!("locked out user {}", username),
        );
        return Ok(Flash::error(
            "/login",
            format!(
                "Too many failed attempts, try again in {} seconds",
                remaining.as_secs().max(1)
            ),
        )
        .into_response());
    }

    let users = state.users.clone();
    let (name, password) = (username.clone(), form.password);
    let outcome = tokio::task::spawn_blocking(move || users.authenticate(&name, &password))
        .await
        .map_err(|e| {
            tracing::error!("Failed to join authentication task: {}", e);
            ApiError::internal("Failed to authenticate")
        })?;

    let user = match outcome {
        Ok(user) => user,
        Err(e) => {
            state.limiter().record_failure(&username);
            tracing::debug!("Login failed for {}: {}", username, e);
            state.audit(
                AuditLevel::Warning,
                None,
                "login",
                format!("failed login for {}", username),
            );
            return Ok(Flash::error("/login", "Invalid username or password").into_response());
        }
    };

    state.limiter().clear(&username);

    // Replace whatever session this browser held before.
    if let Some(old) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(old.value());
    }

    let max_upload = max_upload_bytes(user.role, Some(&user));
    let session = state.sessions.create(&user.username, user.role, max_upload);
    state.audit(AuditLevel::Success, Some(&session), "login", "logged in");

    let jar = jar.add(session_cookie(&session.token));
    Ok((jar, Redirect::to("/files")).into_response())
}

/// GET /logout - End the session and clear the cookie.
pub async fn logout(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(session) = &session {
        state.sessions.destroy(&session.token);
        state.audit(AuditLevel::Info, Some(session), "logout", "logged out");
    }

    (jar.remove(removal_cookie()), Redirect::to("/login"))
}

