//! Upload admission and placement.
//!
//! Administrators publish straight into the download root. Everyone else
//! uploads into `pending_root/<username>/` and waits for review.

use super::path::{sanitize_filename, RelPath};
use super::store::Root;
use crate::auth::Session;
use crate::{Result, StageboxError};

/// Where an accepted upload is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    /// Download root for admins, the uploader's pending tree otherwise.
    pub root: Root,
    /// Directory under `root`.
    pub dir: RelPath,
    /// Sanitized file name.
    pub filename: String,
}

impl UploadPlan {
    /// Full path under `root`.
    pub fn path(&self) -> RelPath {
        self.dir.join(&self.filename)
    }

    /// Hidden sibling the body is streamed into before it replaces
    /// [`path`](Self::path).
    pub fn staging_path(&self) -> RelPath {
        self.dir.join(&format!(".{}.part", self.filename))
    }

    /// Whether the upload needs review before it is visible.
    pub fn is_pending(&self) -> bool {
        matches!(self.root, Root::Pending(_))
    }
}

/// Check a size against the session quota (0 = unlimited).
pub fn admit_upload(session: &Session, size: u64) -> Result<()> {
    let limit = session.max_upload_bytes;
    if limit > 0 && size > limit {
        return Err(StageboxError::QuotaExceeded { size, limit });
    }
    Ok(())
}

/// Decide where an upload goes.
///
/// `directory` is the target folder picked by the uploader. For folder
/// uploads `relative_path` is the browser-supplied `folder/sub/name.ext`:
/// its directory part is appended to `directory` and its last segment
/// replaces `filename`.
pub fn plan_upload(
    session: &Session,
    directory: &str,
    relative_path: Option<&str>,
    filename: &str,
) -> Result<UploadPlan> {
    let mut dir = RelPath::parse(directory)?;
    let mut name = filename;

    if let Some(relative) = relative_path.filter(|r| !r.trim().is_empty()) {
        let relative_dir = match relative.rfind(['/', '\\']) {
            Some(idx) => {
                name = &relative[idx + 1..];
                &relative[..idx]
            }
            None => {
                name = relative;
                ""
            }
        };
        dir = dir.join_rel(&RelPath::parse(relative_dir)?);
    }

    let root = if session.is_admin() {
        Root::Download
    } else {
        Root::pending(&session.username)?
    };

    Ok(UploadPlan {
        root,
        dir,
        filename: sanitize_filename(name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, GIB};
    use chrono::Utc;

    fn session(role: Role, max: u64) -> Session {
        Session {
            token: "t".to_string(),
            username: "normaluser".to_string(),
            role,
            created_at: Utc::now(),
            max_upload_bytes: max,
        }
    }

    #[test]
    fn test_admit_quota_boundary() {
        let s = session(Role::Test, GIB);
        assert!(admit_upload(&s, GIB).is_ok());
        assert!(matches!(
            admit_upload(&s, GIB + 1),
            Err(StageboxError::QuotaExceeded { size, limit }) if size == GIB + 1 && limit == GIB
        ));
    }

    #[test]
    fn test_admit_unlimited() {
        let s = session(Role::Admin, 0);
        assert!(admit_upload(&s, u64::MAX).is_ok());
    }

    #[test]
    fn test_plan_non_admin_goes_to_pending() {
        let plan = plan_upload(&session(Role::Normal, 0), "docs", None, "a.txt").unwrap();
        assert_eq!(plan.root, Root::Pending("normaluser".into()));
        assert_eq!(plan.path().as_string(), "docs/a.txt");
        assert!(plan.is_pending());
    }

    #[test]
    fn test_plan_admin_goes_to_download() {
        let plan = plan_upload(&session(Role::Admin, 0), "docs", None, "a.txt").unwrap();
        assert_eq!(plan.root, Root::Download);
        assert!(!plan.is_pending());
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        let plan = plan_upload(&session(Role::Normal, 0), "docs", None, "a.txt").unwrap();
        assert_eq!(plan.staging_path().as_string(), "docs/.a.txt.part");
    }

    #[test]
    fn test_plan_sanitizes_filename() {
        let plan = plan_upload(&session(Role::Normal, 0), "", None, "../../bad:name?.txt").unwrap();
        assert!(plan.dir.is_root());
        assert_eq!(plan.filename, "bad_name_.txt");
    }

    #[test]
    fn test_plan_rejects_traversal_directory() {
        let result = plan_upload(&session(Role::Normal, 0), "../etc", None, "a.txt");
        assert!(matches!(result, Err(StageboxError::InvalidPath(_))));
    }

    #[test]
    fn test_plan_folder_upload() {
        let plan = plan_upload(
            &session(Role::Normal, 0),
            "docs",
            Some("photos/2024/img*1.jpg"),
            "img*1.jpg",
        )
        .unwrap();
        assert_eq!(plan.dir.as_string(), "docs/photos/2024");
        assert_eq!(plan.filename, "img_1.jpg");
    }

    #[test]
    fn test_plan_folder_upload_traversal() {
        let result = plan_upload(&session(Role::Normal, 0), "docs", Some("../../x/a.txt"), "a.txt");
        assert!(matches!(result, Err(StageboxError::InvalidPath(_))));
    }

    #[test]
    fn test_plan_empty_relative_path_ignored() {
        let plan = plan_upload(&session(Role::Normal, 0), "docs", Some(""), "a.txt").unwrap();
        assert_eq!(plan.path().as_string(), "docs/a.txt");
    }
}
