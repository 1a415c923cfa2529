//! Request DTOs: query strings and form bodies.

use serde::Deserialize;
use validator::Validate;

/// `?path=` on listing pages.
#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    /// Directory relative to the root; empty for the root.
    #[serde(default)]
    pub path: String,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// New directory form.
#[derive(Debug, Deserialize)]
pub struct MkdirForm {
    /// Parent directory.
    #[serde(default)]
    pub parent_dir: String,
    /// Name of the directory to create.
    #[serde(default)]
    pub dir_name: String,
}

/// Batch delete / move / copy form; `files` repeats once per item.
#[derive(Debug, Default, Deserialize)]
pub struct BatchForm {
    /// Selected paths.
    #[serde(default)]
    pub files: Vec<String>,
    /// Destination directory (move and copy only).
    #[serde(default)]
    pub target_path: String,
}

/// Approve form.
#[derive(Debug, Deserialize)]
pub struct ApproveForm {
    /// File name.
    pub file: String,
    /// Directory of the file under the owner's pending tree.
    #[serde(default)]
    pub current_path: String,
    /// Destination directory under the download root.
    #[serde(default)]
    pub target_dir: String,
    /// Owner of the pending file.
    pub username: String,
}

/// Reject form.
#[derive(Debug, Deserialize)]
pub struct RejectForm {
    /// File name.
    pub file: String,
    /// Directory of the file under the owner's pending tree.
    #[serde(default)]
    pub current_path: String,
    /// Owner of the pending file.
    pub username: String,
}

/// Add-user form.
#[derive(Debug, Deserialize, Validate)]
pub struct AddUserForm {
    /// Username.
    #[validate(length(min = 1, max = 32, message = "Username must be 1-32 characters"))]
    pub new_username: String,
    /// Initial password.
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_user_pwd: String,
    /// `test`, `normal` or `admin`.
    #[serde(default)]
    pub new_user_role: String,
    /// Upload quota in MiB; empty for the role default.
    #[serde(default)]
    pub new_user_size: String,
}

/// Change-password form.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordForm {
    /// Account to change.
    pub username: String,
    /// New password.
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
    /// Repeat of the new password, checked when present.
    #[serde(default)]
    pub confirm_password: Option<String>,
}

/// Delete-user form.
#[derive(Debug, Deserialize)]
pub struct DeleteUserForm {
    /// Account to delete.
    pub delete_user: String,
}

/// `/logs` query.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    /// Only entries of this level.
    #[serde(default)]
    pub level: Option<String>,
    /// Maximum number of entries.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_user_validation() {
        let form = AddUserForm {
            new_username: "alice".to_string(),
            new_user_pwd: "short".to_string(),
            new_user_role: "normal".to_string(),
            new_user_size: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("new_user_pwd"));
        assert!(!errors.field_errors().contains_key("new_username"));
    }

    #[test]
    fn test_change_password_validation() {
        let form = ChangePasswordForm {
            username: "alice".to_string(),
            new_password: "long enough".to_string(),
            confirm_password: None,
        };
        assert!(form.validate().is_ok());
    }
}
