//! Authentication module for stagebox.
//!
//! Roles and quotas, password hashing, the in-memory session table and the
//! user directory.

mod password;
pub mod permission;
mod role;
mod session;
mod users;
pub mod validation;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use permission::{check_permission, is_admin, Action, PermissionError};
pub use role::{max_upload_bytes, Role, GIB, MIB};
pub use session::{
    LimitResult, LoginLimiter, Session, SessionError, SessionStore, LOCKOUT_DURATION_SECS,
    MAX_LOGIN_ATTEMPTS, SESSION_DURATION_SECS,
};
pub use users::{ConfigUserDirectory, NewUser, UserDirectory, ADMIN_USERNAME};
pub use validation::ValidationError;
