//! Pending upload review.
//!
//! A file is pending while it sits under `pending_root/<owner>/` and
//! resolved once it is gone from there: approval moves it into the download
//! root, rejection deletes it. No other status is stored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::path::{sanitize_filename, RelPath};
use super::store::{ObjectStore, Root};
use crate::{Result, StageboxError};

/// A staged upload awaiting a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    /// Uploader.
    pub owner: String,
    /// Directory under the owner's pending root.
    pub dir: RelPath,
    /// File name.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Upload time (modification time of the staged file).
    pub modified: Option<DateTime<Utc>>,
    /// Suggested publish directory: where the uploader aimed it.
    pub default_target: RelPath,
}

impl PendingItem {
    /// Path under the owner's pending root.
    pub fn path(&self) -> RelPath {
        self.dir.join(&self.filename)
    }
}

/// Approve/reject workflow over an [`ObjectStore`].
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ObjectStore>,
}

impl ReviewService {
    /// Create a service over `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Owners whose names are usable as a pending root.
    fn owners(&self) -> Result<Vec<(String, Root)>> {
        Ok(self
            .store
            .pending_owners()?
            .into_iter()
            .filter_map(|owner| match Root::pending(&owner) {
                Ok(root) => Some((owner, root)),
                Err(_) => {
                    warn!("Ignoring pending directory with unusable name: {:?}", owner);
                    None
                }
            })
            .collect())
    }

    /// Every pending file of every owner beneath `scope`, newest first.
    pub fn discover(&self, scope: &RelPath) -> Result<Vec<PendingItem>> {
        let mut items = Vec::new();

        for (owner, root) in self.owners()? {
            if !scope.is_root() && !self.store.exists(&root, scope) {
                continue;
            }
            for entry in self.store.walk_files(&root, scope)? {
                let dir = entry.path.parent().unwrap_or_default();
                items.push(PendingItem {
                    owner: owner.clone(),
                    default_target: dir.clone(),
                    dir,
                    filename: entry.name,
                    size: entry.size,
                    modified: entry.modified,
                });
            }
        }

        items.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| a.owner.cmp(&b.owner))
                .then_with(|| a.path().as_string().cmp(&b.path().as_string()))
        });
        Ok(items)
    }

    /// Number of pending files across all owners.
    pub fn pending_count(&self) -> Result<usize> {
        let mut count = 0;
        for (_, root) in self.owners()? {
            count += self.store.walk_files(&root, &RelPath::root())?.len();
        }
        Ok(count)
    }

    /// Publish directories an item can be approved into, root first.
    pub fn directory_choices(&self) -> Result<Vec<RelPath>> {
        let mut dirs = vec![RelPath::root()];
        dirs.extend(self.store.walk_dirs(&Root::Download)?);
        Ok(dirs)
    }

    /// Move `owner`'s pending `current_path/filename` to
    /// `target_dir/filename` under the download root.
    ///
    /// The target directory is created before the move; if that fails the
    /// pending file is left untouched. Returns the published path.
    pub fn approve(
        &self,
        filename: &str,
        owner: &str,
        current_path: &str,
        target_dir: &str,
    ) -> Result<RelPath> {
        let name = sanitize_filename(filename);
        let root = Root::pending(owner)?;
        let current = RelPath::parse(current_path)?;
        let target = RelPath::parse(target_dir)?;

        let source = current.join(&name);
        if !self.store.exists(&root, &source) {
            return Err(StageboxError::NotFound(format!("pending file {source}")));
        }

        self.store.create_dir_all(&Root::Download, &target)?;
        let destination = target.join(&name);
        self.store
            .rename(&root, &source, &Root::Download, &destination)?;

        info!(owner = %owner, from = %source, to = %destination, "Approved pending upload");
        self.prune(&root, &current);
        Ok(destination)
    }

    /// Delete `owner`'s pending `current_path/filename`, file or directory.
    pub fn reject(&self, filename: &str, owner: &str, current_path: &str) -> Result<RelPath> {
        let name = sanitize_filename(filename);
        let root = Root::pending(owner)?;
        let current = RelPath::parse(current_path)?;

        let target = current.join(&name);
        self.store.delete(&root, &target)?;

        info!(owner = %owner, path = %target, "Rejected pending upload");
        self.prune(&root, &current);
        Ok(target)
    }

    /// Delete a published path and the same path under every owner's
    /// pending tree.
    ///
    /// Returns the owners whose pending copy was removed. Pending cleanup
    /// failures are logged, not returned.
    pub fn delete_published(&self, path: &RelPath) -> Result<Vec<String>> {
        if path.is_root() {
            return Err(StageboxError::InvalidPath(
                "refusing to delete the download root".to_string(),
            ));
        }

        self.store.delete(&Root::Download, path)?;

        let mut cleaned = Vec::new();
        for (owner, root) in self.owners()? {
            if !self.store.exists(&root, path) {
                continue;
            }
            match self.store.delete(&root, path) {
                Ok(()) => {
                    info!(owner = %owner, path = %path, "Removed stale pending copy");
                    cleaned.push(owner);
                }
                Err(e) => warn!("Failed to remove pending copy of {} for {}: {}", path, owner, e),
            }
        }
        Ok(cleaned)
    }

    /// Best-effort removal of emptied pending directories.
    fn prune(&self, root: &Root, start: &RelPath) {
        if let Err(e) = self.store.prune_empty_dirs(root, start) {
            warn!("Failed to prune empty pending directories at {}: {}", start, e);
        }
    }
}
