//! Input validation for user management.

use thiserror::Error;

use super::role::MIB;
use crate::file::RelPath;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is empty.
    #[error("username cannot be empty")]
    UsernameEmpty,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username can't name a pending directory.
    #[error("username contains invalid characters")]
    UsernameInvalidChars,

    /// Username is reserved.
    #[error("this username is reserved")]
    UsernameReserved,

    /// Quota field is not a number of MiB.
    #[error("upload limit must be a whole number of MB")]
    QuotaInvalid,
}

/// Names the audit log uses for anonymous requests.
const RESERVED_USERNAMES: &[&str] = &["anonymous", "guest"];

/// Validate a username.
///
/// The name becomes a directory under the pending root, so it must be one
/// safe path segment and free of the characters filenames can't hold.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if username != username.trim()
        || username.chars().any(|c| c.is_control() || "<>:\"/\\|?*".contains(c))
        || RelPath::segment(username).is_err()
    {
        return Err(ValidationError::UsernameInvalidChars);
    }
    if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        return Err(ValidationError::UsernameReserved);
    }
    Ok(())
}

/// Parse the quota field of the add-user form.
///
/// The value is in MiB; empty means "use the role default" and yields
/// `None`. `0` means unlimited.
pub fn parse_quota_mib(raw: &str) -> Result<Option<u64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let mib: u64 = raw.parse().map_err(|_| ValidationError::QuotaInvalid)?;
    mib.checked_mul(MIB)
        .map(Some)
        .ok_or(ValidationError::QuotaInvalid)
}
