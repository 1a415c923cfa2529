//! Permission checking.
//!
//! Browsing and downloading are open to everyone. Uploading needs a session.
//! Everything that changes or inspects the shared tree beyond that needs an
//! administrator.

use thiserror::Error;

use super::session::Session;
use crate::StageboxError;

/// Permission-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// No session.
    #[error("login required")]
    NotAuthenticated,

    /// Session exists but is not an administrator.
    #[error("administrator privileges required")]
    AdminRequired,
}

impl From<PermissionError> for StageboxError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::NotAuthenticated => StageboxError::Unauthorized(err.to_string()),
            PermissionError::AdminRequired => StageboxError::Forbidden(err.to_string()),
        }
    }
}

/// Operations gated by [`check_permission`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// List the download root.
    Browse,
    /// Fetch a published file.
    Download,
    /// Upload into the download root (admin) or the caller's pending tree.
    Upload,
    /// mkdir, delete and the batch operations.
    ManageFiles,
    /// Review, approve and reject pending uploads.
    Review,
    /// Add, delete and re-password users.
    ManageUsers,
    /// Dashboard, server info and audit log.
    ViewServer,
}

impl Action {
    /// Minimum requirement for this action.
    fn requirement(self) -> Requirement {
        match self {
            Action::Browse | Action::Download => Requirement::Anyone,
            Action::Upload => Requirement::Session,
            Action::ManageFiles | Action::Review | Action::ManageUsers | Action::ViewServer => {
                Requirement::Admin
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Anyone,
    Session,
    Admin,
}

/// Check whether `session` may perform `action`.
///
/// ```
/// use stagebox::auth::{check_permission, Action, PermissionError};
///
/// assert!(check_permission(None, Action::Browse).is_ok());
/// assert_eq!(
///     check_permission(None, Action::Upload),
///     Err(PermissionError::NotAuthenticated)
/// );
/// ```
pub fn check_permission(session: Option<&Session>, action: Action) -> Result<(), PermissionError> {
    match action.requirement() {
        Requirement::Anyone => Ok(()),
        Requirement::Session => session.map(|_| ()).ok_or(PermissionError::NotAuthenticated),
        Requirement::Admin => {
            let session = session.ok_or(PermissionError::NotAuthenticated)?;
            if is_admin(Some(session)) {
                Ok(())
            } else {
                Err(PermissionError::AdminRequired)
            }
        }
    }
}

/// Whether the request carries an administrator session.
pub fn is_admin(session: Option<&Session>) -> bool {
    session.map(Session::is_admin).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::Utc;

    fn session(role: Role) -> Session {
        Session {
            token: "t".to_string(),
            username: "u".to_string(),
            role,
            created_at: Utc::now(),
            max_upload_bytes: 0,
        }
    }

    #[test]
    fn test_anonymous() {
        assert!(check_permission(None, Action::Browse).is_ok());
        assert!(check_permission(None, Action::Download).is_ok());
        assert_eq!(
            check_permission(None, Action::Upload),
            Err(PermissionError::NotAuthenticated)
        );
        assert_eq!(
            check_permission(None, Action::Review),
            Err(PermissionError::NotAuthenticated)
        );
    }

    #[test]
    fn test_non_admin_session() {
        for role in [Role::Test, Role::Normal] {
            let s = session(role);
            assert!(check_permission(Some(&s), Action::Upload).is_ok());
            for action in [
                Action::ManageFiles,
                Action::Review,
                Action::ManageUsers,
                Action::ViewServer,
            ] {
                assert_eq!(
                    check_permission(Some(&s), action),
                    Err(PermissionError::AdminRequired)
                );
            }
        }
    }

    #[test]
    fn test_admin_session() {
        let s = session(Role::Admin);
        for action in [
            Action::Browse,
            Action::Download,
            Action::Upload,
            Action::ManageFiles,
            Action::Review,
            Action::ManageUsers,
            Action::ViewServer,
        ] {
            assert!(check_permission(Some(&s), action).is_ok());
        }
    }

    #[test]
    fn test_is_admin() {
        assert!(!is_admin(None));
        assert!(!is_admin(Some(&session(Role::Normal))));
        assert!(is_admin(Some(&session(Role::Admin))));
    }

    #[test]
    fn test_error_mapping() {
        let err: StageboxError = PermissionError::NotAuthenticated.into();
        assert!(matches!(err, StageboxError::Unauthorized(_)));
        let err: StageboxError = PermissionError::AdminRequired.into();
        assert!(matches!(err, StageboxError::Forbidden(_)));
    }
}
