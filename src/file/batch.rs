//! Batch delete, move and copy over the download root.
//!
//! Items are processed independently; a failure is counted and the batch
//! carries on. Nothing is rolled back.

use std::fmt;

use tracing::warn;

use super::path::RelPath;
use super::review::ReviewService;
use super::store::{unique_name, ObjectStore, Root};
use crate::{Result, StageboxError};

/// Outcome of a batch operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items that were processed.
    pub succeeded: usize,
    /// Items that failed, including unparseable paths.
    pub failed: usize,
}

impl BatchReport {
    fn record<T>(&mut self, item: &str, outcome: Result<T>) {
        match outcome {
            Ok(_) => self.succeeded += 1,
            Err(e) => {
                warn!("Batch item {:?} failed: {}", item, e);
                self.failed += 1;
            }
        }
    }

    /// Whether every item succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

/// Parse a batch item, which must name something below the root.
fn parse_item(raw: &str) -> Result<RelPath> {
    let path = RelPath::parse(raw)?;
    if path.is_root() {
        return Err(StageboxError::InvalidPath(format!("{raw:?} names the root")));
    }
    Ok(path)
}

/// Delete each path, cascading to pending copies as a single delete does.
pub fn batch_delete(review: &ReviewService, items: &[String]) -> BatchReport {
    let mut report = BatchReport::default();
    for item in items {
        let outcome = parse_item(item).and_then(|path| review.delete_published(&path));
        report.record(item, outcome);
    }
    report
}

/// Move each path into `target`, renaming on collision.
///
/// An invalid `target` fails the whole batch before anything is touched.
pub fn batch_move(store: &dyn ObjectStore, items: &[String], target: &str) -> Result<BatchReport> {
    transfer(store, items, target, Transfer::Move)
}

/// Copy each path into `target`, renaming on collision.
///
/// A directory can't be copied into itself or its own subtree.
pub fn batch_copy(store: &dyn ObjectStore, items: &[String], target: &str) -> Result<BatchReport> {
    transfer(store, items, target, Transfer::Copy)
}

#[derive(Debug, Clone, Copy)]
enum Transfer {
    Move,
    Copy,
}

fn transfer(
    store: &dyn ObjectStore,
    items: &[String],
    target: &str,
    kind: Transfer,
) -> Result<BatchReport> {
    let target = RelPath::parse(target)?;
    store.create_dir_all(&Root::Download, &target)?;

    let mut report = BatchReport::default();
    for item in items {
        let outcome =
            parse_item(item).and_then(|source| transfer_one(store, &source, &target, kind));
        report.record(item, outcome);
    }
    Ok(report)
}

fn transfer_one(
    store: &dyn ObjectStore,
    source: &RelPath,
    target: &RelPath,
    kind: Transfer,
) -> Result<RelPath> {
    let meta = store.metadata(&Root::Download, source)?;
    if meta.is_dir && target.starts_with(source) {
        return Err(StageboxError::InvalidPath(format!(
            "cannot place {source} inside itself"
        )));
    }

    let name = unique_name(store, &Root::Download, target, &meta.name);
    let destination = target.join(&name);
    match kind {
        Transfer::Move => store.rename(&Root::Download, source, &Root::Download, &destination)?,
        Transfer::Copy => store.copy(&Root::Download, source, &Root::Download, &destination)?,
    }
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::LocalObjectStore;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<LocalObjectStore>) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(
            LocalObjectStore::new(temp.path().join("downloads"), temp.path().join("pending"))
                .unwrap(),
        );
        (temp, store)
    }

    fn rel(s: &str) -> RelPath {
        RelPath::parse(s).unwrap()
    }

    fn put(store: &LocalObjectStore, root: &Root, path: &str) {
        let full = store.resolve(root, &rel(path));
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, path.as_bytes()).unwrap();
    }

    fn items(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_report_display() {
        let report = BatchReport {
            succeeded: 3,
            failed: 1,
        };
        assert_eq!(report.to_string(), "3 succeeded, 1 failed");
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_batch_delete_counts_failures() {
        let (_temp, store) = setup();
        put(&store, &Root::Download, "a.txt");
        put(&store, &Root::Download, "dir/b.txt");
        let review = ReviewService::new(store.clone());

        let report = batch_delete(&review, &items(&["a.txt", "dir", "missing.txt", "../x", "."]));
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 3);
        assert!(!store.exists(&Root::Download, &rel("dir")));
    }

    #[test]
    fn test_batch_delete_cascades() {
        let (_temp, store) = setup();
        put(&store, &Root::Download, "docs/a.txt");
        put(&store, &Root::Pending("carol".into()), "docs/a.txt");
        let review = ReviewService::new(store.clone());

        let report = batch_delete(&review, &items(&["docs/a.txt"]));
        assert!(report.all_succeeded());
        assert!(!store.exists(&Root::Pending("carol".into()), &rel("docs/a.txt")));
    }

    #[test]
    fn test_batch_move_with_collision() {
        let (_temp, store) = setup();
        put(&store, &Root::Download, "a.txt");
        put(&store, &Root::Download, "b.txt");
        put(&store, &Root::Download, "dest/a.txt");

        let report = batch_move(&*store, &items(&["a.txt", "b.txt"]), "dest").unwrap();
        assert_eq!(report.succeeded, 2);
        assert!(store.exists(&Root::Download, &rel("dest/a_1.txt")));
        assert!(store.exists(&Root::Download, &rel("dest/b.txt")));
        assert!(!store.exists(&Root::Download, &rel("a.txt")));
    }

    #[test]
    fn test_batch_move_creates_target() {
        let (_temp, store) = setup();
        put(&store, &Root::Download, "a.txt");

        batch_move(&*store, &items(&["a.txt"]), "new/place").unwrap();
        assert!(store.exists(&Root::Download, &rel("new/place/a.txt")));
    }

    #[test]
    fn test_batch_move_invalid_target_touches_nothing() {
        let (_temp, store) = setup();
        put(&store, &Root::Download, "a.txt");

        let result = batch_move(&*store, &items(&["a.txt"]), "../escape");
        assert!(matches!(result, Err(StageboxError::InvalidPath(_))));
        assert!(store.exists(&Root::Download, &rel("a.txt")));
    }

    #[test]
    fn test_batch_copy_collision_sequence() {
        let (_temp, store) = setup();
        put(&store, &Root::Download, "report.txt");
        put(&store, &Root::Download, "out/report.txt");

        batch_copy(&*store, &items(&["report.txt"]), "out").unwrap();
        batch_copy(&*store, &items(&["report.txt"]), "out").unwrap();

        assert!(store.exists(&Root::Download, &rel("out/report_1.txt")));
        assert!(store.exists(&Root::Download, &rel("out/report_2.txt")));
        assert!(store.exists(&Root::Download, &rel("report.txt")));
    }

    #[test]
    fn test_batch_copy_directory() {
        let (_temp, store) = setup();
        put(&store, &Root::Download, "src/a.txt");
        put(&store, &Root::Download, "src/sub/b.txt");

        let report = batch_copy(&*store, &items(&["src"]), "backup").unwrap();
        assert!(report.all_succeeded());
        assert!(store.exists(&Root::Download, &rel("backup/src/sub/b.txt")));
    }

    #[test]
    fn test_batch_copy_into_own_subtree_fails() {
        let (_temp, store) = setup();
        put(&store, &Root::Download, "src/a.txt");

        let report = batch_copy(&*store, &items(&["src"]), "src/inner").unwrap();
        assert_eq!(report.failed, 1);
        assert!(!store.exists(&Root::Download, &rel("src/inner/src")));
    }
}
