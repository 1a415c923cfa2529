//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::audit::LogEntry;
use crate::auth::{max_upload_bytes, Session};
use crate::config::UserRecord;
use crate::file::{Entry, PendingItem, RelPath};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

fn timestamp(time: Option<DateTime<Utc>>) -> Option<String> {
    time.map(|t| t.to_rfc3339())
}

/// Caller identity.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Username.
    pub username: String,
    /// Role name.
    pub role: String,
    /// Whether the caller may manage files and users.
    pub is_admin: bool,
    /// Upload quota in bytes, 0 for unlimited.
    pub max_upload_bytes: u64,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            username: session.username.clone(),
            role: session.role.as_str().to_string(),
            is_admin: session.is_admin(),
            max_upload_bytes: session.max_upload_bytes,
        }
    }
}

/// `GET /login`.
#[derive(Debug, Serialize)]
pub struct LoginViewResponse {
    /// Present when the caller is already logged in.
    pub session: Option<SessionView>,
}

/// One directory entry.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Final path segment.
    pub name: String,
    /// Path relative to the root.
    pub path: String,
    /// Directory flag.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification, RFC 3339.
    pub modified: Option<String>,
}

impl From<Entry> for EntryResponse {
    fn from(entry: Entry) -> Self {
        Self {
            name: entry.name,
            path: entry.path.as_string(),
            is_dir: entry.is_dir,
            size: entry.size,
            modified: timestamp(entry.modified),
        }
    }
}

/// `GET /files`.
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    /// Listed directory.
    pub path: String,
    /// Parent directory, absent at the root.
    pub parent: Option<String>,
    /// Directories first, then newest first.
    pub entries: Vec<EntryResponse>,
    /// Whether management actions are offered.
    pub can_manage: bool,
    /// Logged-in user, if any.
    pub session: Option<SessionView>,
}

/// Directories of the download root, root first.
#[derive(Debug, Serialize)]
pub struct DirectoryChoicesResponse {
    /// Relative paths, `.` for the root.
    pub directories: Vec<String>,
}

impl DirectoryChoicesResponse {
    /// Convert store paths.
    pub fn new(dirs: Vec<RelPath>) -> Self {
        Self {
            directories: dirs.iter().map(RelPath::as_string).collect(),
        }
    }
}

/// `GET /upload`.
#[derive(Debug, Serialize)]
pub struct UploadViewResponse {
    /// Target directory choices.
    pub directories: Vec<String>,
    /// Caller's quota in bytes, 0 for unlimited.
    pub max_upload_bytes: u64,
    /// Whether uploads wait for review.
    pub requires_review: bool,
}

/// One pending upload.
#[derive(Debug, Serialize)]
pub struct PendingItemResponse {
    /// Uploader.
    pub owner: String,
    /// Directory under the uploader's pending tree.
    pub current_path: String,
    /// File name.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Upload time, RFC 3339.
    pub modified: Option<String>,
    /// Suggested publish directory.
    pub default_target: String,
}

impl From<PendingItem> for PendingItemResponse {
    fn from(item: PendingItem) -> Self {
        Self {
            owner: item.owner,
            current_path: item.dir.as_string(),
            filename: item.filename,
            size: item.size,
            modified: timestamp(item.modified),
            default_target: item.default_target.as_string(),
        }
    }
}

/// `GET /review`.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    /// Scope of the listing.
    pub path: String,
    /// Pending uploads, newest first.
    pub items: Vec<PendingItemResponse>,
    /// Publish directory choices.
    pub directories: Vec<String>,
}

/// `GET /admin`.
#[derive(Debug, Serialize)]
pub struct AdminSummaryResponse {
    /// Files awaiting review.
    pub pending_files: usize,
    /// Configured accounts.
    pub users: usize,
    /// Live sessions.
    pub active_sessions: usize,
}

/// File count and total size of a root.
#[derive(Debug, Default, Serialize)]
pub struct RootUsage {
    /// Configured location.
    pub location: String,
    /// Regular files.
    pub files: usize,
    /// Sum of file sizes.
    pub bytes: u64,
}

/// `GET /info`.
#[derive(Debug, Serialize)]
pub struct ServerInfoResponse {
    /// Crate version, `v`-prefixed.
    pub version: String,
    /// Seconds since start.
    pub uptime_secs: u64,
    /// Operating system.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Available parallelism.
    pub cpus: usize,
    /// HTTP port.
    pub port: u16,
    /// Published files.
    pub download: RootUsage,
    /// Files awaiting review.
    pub pending: RootUsage,
    /// Live sessions.
    pub active_sessions: usize,
}

/// `GET /logs`.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    /// Applied level filter.
    pub level: Option<String>,
    /// Entries, newest first.
    pub entries: Vec<LogEntry>,
}

/// One account, without credentials.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Username.
    pub username: String,
    /// Role name.
    pub role: String,
    /// Effective upload quota in bytes, 0 for unlimited.
    pub max_upload_bytes: u64,
    /// Whether the quota comes from the account rather than the role.
    pub custom_quota: bool,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            max_upload_bytes: max_upload_bytes(user.role, Some(user)),
            custom_quota: user.max_file_size.is_some(),
        }
    }
}

/// `GET /user-management`.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    /// Accounts in configuration order.
    pub users: Vec<UserResponse>,
}
