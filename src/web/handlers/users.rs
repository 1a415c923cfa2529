//! User management handlers.

use axum::{extract::State, Form, Json};
use validator::Validate;

use crate::audit::AuditLevel;
use crate::auth::validation::parse_quota_mib;
use crate::auth::{NewUser, Role, ADMIN_USERNAME};
use crate::web::dto::{
    validation_message, AddUserForm, ApiResponse, ChangePasswordForm, DeleteUserForm,
    UserListResponse, UserResponse,
};
use crate::web::error::Flash;
use crate::web::handlers::SharedState;
use crate::web::middleware::RequireAdmin;
use crate::StageboxError;

const PAGE: &str = "/user-management";

/// GET /user-management - Accounts without credentials.
pub async fn user_management(
    State(state): State<SharedState>,
    RequireAdmin(_session): RequireAdmin,
) -> Json<ApiResponse<UserListResponse>> {
    let users = state.users.list().iter().map(UserResponse::from).collect();
    Json(ApiResponse::new(UserListResponse { users }))
}

/// POST /add-user
pub async fn add_user(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    Form(form): Form<AddUserForm>,
) -> Flash {
    if let Err(errors) = form.validate() {
        return Flash::error(PAGE, validation_message(&errors));
    }

    let max_file_size = match parse_quota_mib(&form.new_user_size) {
        Ok(quota) => quota,
        Err(e) => return Flash::error(PAGE, e.to_string()),
    };

    let username = form.new_username.trim().to_string();
    let role = Role::parse_lenient(&form.new_user_role);
    let new_user = NewUser {
        username: username.clone(),
        password: form.new_user_pwd,
        role,
        max_file_size,
    };

    let users = state.users.clone();
    let outcome = tokio::task::spawn_blocking(move || users.add_user(new_user))
        .await
        .unwrap_or_else(|e| Err(StageboxError::Config(format!("add-user task failed: {e}"))));

    match outcome {
        Ok(()) => {
            state.audit(
                AuditLevel::Success,
                Some(&session),
                "add-user",
                format!("{} ({})", username, role),
            );
            Flash::success(PAGE, format!("User {} added", username))
        }
        Err(StageboxError::AlreadyExists(_)) => {
            Flash::error(PAGE, format!("User {} already exists", username))
        }
        Err(e) => {
            state.audit(
                AuditLevel::Error,
                Some(&session),
                "add-user",
                format!("{}: {}", username, e),
            );
            Flash::failure(PAGE, "Failed to add user", &e)
        }
    }
}

/// POST /change-password
///
/// Every session of the account is ended afterwards.
pub async fn change_password(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    Form(form): Form<ChangePasswordForm>,
) -> Flash {
    if let Err(errors) = form.validate() {
        return Flash::error(PAGE, validation_message(&errors));
    }
    if form
        .confirm_password
        .as_ref()
        .is_some_and(|confirm| *confirm != form.new_password)
    {
        return Flash::error(PAGE, "Passwords do not match");
    }

    let username = form.username.clone();
    let users = state.users.clone();
    let outcome =
        tokio::task::spawn_blocking(move || users.change_password(&form.username, &form.new_password))
            .await
            .unwrap_or_else(|e| {
                Err(StageboxError::Config(format!("change-password task failed: {e}")))
            });

    match outcome {
        Ok(()) => {
            let ended = state.sessions.destroy_user(&username);
            state.audit(
                AuditLevel::Success,
                Some(&session),
                "change-password",
                format!("{} ({} sessions ended)", username, ended),
            );
            Flash::success(PAGE, format!("Password of {} changed", username))
        }
        Err(e) => {
            state.audit(
                AuditLevel::Error,
                Some(&session),
                "change-password",
                format!("{}: {}", username, e),
            );
            Flash::failure(PAGE, "Failed to change password", &e)
        }
    }
}

/// POST /delete-user
pub async fn delete_user(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    Form(form): Form<DeleteUserForm>,
) -> Flash {
    let username = form.delete_user.trim();
    if username.is_empty() {
        return Flash::error(PAGE, "No user selected");
    }
    if username == ADMIN_USERNAME {
        return Flash::error(PAGE, "The admin account cannot be deleted");
    }
    if username == session.username {
        return Flash::error(PAGE, "You cannot delete your own account");
    }

    match state.users.delete_user(username) {
        Ok(()) => {
            let ended = state.sessions.destroy_user(username);
            state.audit(
                AuditLevel::Success,
                Some(&session),
                "delete-user",
                format!("{} ({} sessions ended)", username, ended),
            );
            Flash::success(PAGE, format!("User {} deleted", username))
        }
        Err(e) => {
            state.audit(
                AuditLevel::Error,
                Some(&session),
                "delete-user",
                format!("{}: {}", username, e),
            );
            Flash::failure(PAGE, "Failed to delete user", &e)
        }
    }
}
