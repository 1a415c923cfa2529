//! Router configuration.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    add_user, admin_dashboard, approve, batch_copy_files, batch_delete_files, batch_move_files,
    change_password, delete, delete_user, download, list_files, login, login_page, logout, mkdir,
    mkdir_page, reject, review_page, server_info, upload, upload_page, user_management, view_logs,
    SharedState,
};
use super::middleware::security_headers;

/// Create the application router.
pub fn create_router(app_state: SharedState) -> Router {
    // Open to everyone; handlers look at the session themselves.
    let public_routes = Router::new()
        .route("/", get(|| async { Redirect::to("/files") }))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/files", get(list_files))
        .route("/download", get(download));

    // Quota is enforced while streaming, not by a body limit.
    let upload_routes = Router::new()
        .route("/upload", get(upload_page).post(upload))
        .layer(DefaultBodyLimit::disable());

    let file_admin_routes = Router::new()
        .route("/mkdir", get(mkdir_page).post(mkdir))
        .route("/delete", get(delete))
        .route("/batch-delete", post(batch_delete_files))
        .route("/batch-move", post(batch_move_files))
        .route("/batch-copy", post(batch_copy_files));

    let review_routes = Router::new()
        .route("/review", get(review_page))
        .route("/approve", post(approve))
        .route("/reject", post(reject));

    let user_routes = Router::new()
        .route("/user-management", get(user_management))
        .route("/add-user", post(add_user))
        .route("/change-password", post(change_password))
        .route("/delete-user", post(delete_user));

    let admin_routes = Router::new()
        .route("/admin", get(admin_dashboard))
        .route("/info", get(server_info))
        .route("/logs", get(view_logs));

    Router::new()
        .merge(public_routes)
        .merge(upload_routes)
        .merge(file_admin_routes)
        .merge(review_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
