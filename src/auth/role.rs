//! Account roles and their upload quotas.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::UserRecord;

/// One gibibyte.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// One mebibyte, the unit quotas are entered in.
pub const MIB: u64 = 1024 * 1024;

/// Account role.
///
/// Stored as a lowercase string. Unknown strings map to [`Role::Test`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Trial account with the smallest quota.
    #[default]
    Test,
    /// Regular uploader.
    Normal,
    /// Administrator: uploads publish directly and may review.
    Admin,
}

impl Role {
    /// Configuration string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Test => "test",
            Role::Normal => "normal",
            Role::Admin => "admin",
        }
    }

    /// Whether this role has administrative privileges.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Upload limit in bytes when the user record doesn't set one
    /// (0 = unlimited).
    pub fn default_max_upload(&self) -> u64 {
        match self {
            Role::Admin => 0,
            Role::Normal => 10 * GIB,
            Role::Test => GIB,
        }
    }

    /// Parse leniently, falling back to [`Role::Test`].
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Role::Test)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "test" => Ok(Role::Test),
            "normal" => Ok(Role::Normal),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse_lenient(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Upload limit for a session: the user record's own limit when it has one,
/// otherwise the role default.
pub fn max_upload_bytes(role: Role, record: Option<&UserRecord>) -> u64 {
    record
        .and_then(|r| r.max_file_size)
        .unwrap_or_else(|| role.default_max_upload())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(max: Option<u64>) -> UserRecord {
        UserRecord {
            username: "u".to_string(),
            password_hash: String::new(),
            password: None,
            role: Role::Normal,
            max_file_size: max,
        }
    }

    #[test]
    fn test_role_round_trip_strings() {
        for role in [Role::Test, Role::Normal, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }
    }

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Normal ".parse::<Role>().unwrap(), Role::Normal);
    }

    #[test]
    fn test_unknown_role_is_test() {
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::parse_lenient("root"), Role::Test);
        assert_eq!(Role::from(String::new()), Role::Test);
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Normal).unwrap();
        assert_eq!(json, "\"normal\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_default_quotas() {
        assert_eq!(Role::Admin.default_max_upload(), 0);
        assert_eq!(Role::Normal.default_max_upload(), 10 * GIB);
        assert_eq!(Role::Test.default_max_upload(), GIB);
    }

    #[test]
    fn test_max_upload_bytes_prefers_record() {
        assert_eq!(max_upload_bytes(Role::Normal, Some(&record(Some(5 * MIB)))), 5 * MIB);
        assert_eq!(max_upload_bytes(Role::Normal, Some(&record(Some(0)))), 0);
    }

    #[test]
    fn test_max_upload_bytes_falls_back_to_role() {
        assert_eq!(max_upload_bytes(Role::Test, Some(&record(None))), GIB);
        assert_eq!(max_upload_bytes(Role::Admin, None), 0);
    }

    #[test]
    fn test_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Normal.is_admin());
        assert!(!Role::Test.is_admin());
    }
}
