//! Filesystem object store.
//!
//! All reads and writes of the download and pending trees go through the
//! [`ObjectStore`] trait so that the review workflow never touches
//! `std::fs` directly. [`LocalObjectStore`] is the on-disk implementation:
//!
//! ```text
//! {download_root}/docs/a.txt             published, visible to everyone
//! {pending_root}/{username}/docs/a.txt   staged upload awaiting review
//! ```

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::path::RelPath;
use crate::{Result, StageboxError};

/// Which tree a relative path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Root {
    /// Published files.
    Download,
    /// One uploader's staged files.
    Pending(String),
}

impl Root {
    /// Pending tree of `owner`, which must be a single safe path segment.
    pub fn pending(owner: &str) -> Result<Self> {
        Ok(Root::Pending(RelPath::segment(owner)?))
    }
}

/// A directory entry or stat result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Last path segment.
    pub name: String,
    /// Path relative to the root it was read from.
    pub path: RelPath,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Modification time, if the platform reported one.
    pub modified: Option<DateTime<Utc>>,
}

/// Storage operations over the download and pending trees.
pub trait ObjectStore: Send + Sync {
    /// Stat a single entry. Fails with `NotFound` when absent.
    fn metadata(&self, root: &Root, path: &RelPath) -> Result<Entry>;

    /// Immediate children of `dir`: directories first, newest first within
    /// each kind. Entries with unreadable metadata sort last.
    fn list(&self, root: &Root, dir: &RelPath) -> Result<Vec<Entry>>;

    /// Every regular file beneath `dir`, recursively.
    fn walk_files(&self, root: &Root, dir: &RelPath) -> Result<Vec<Entry>>;

    /// Every directory beneath the root, sorted by path. The root itself is
    /// not included.
    fn walk_dirs(&self, root: &Root) -> Result<Vec<RelPath>>;

    /// Usernames that own a pending subtree.
    fn pending_owners(&self) -> Result<Vec<String>>;

    /// Atomic rename. Parent directories of `to` are created first. A rename
    /// the OS refuses (for example across devices) fails with `Io`.
    fn rename(&self, from_root: &Root, from: &RelPath, to_root: &Root, to: &RelPath)
        -> Result<()>;

    /// Copy a file or a directory tree, preserving permission bits.
    fn copy(&self, from_root: &Root, from: &RelPath, to_root: &Root, to: &RelPath) -> Result<()>;

    /// Delete a file, or a directory with its contents. `NotFound` when
    /// absent.
    fn delete(&self, root: &Root, path: &RelPath) -> Result<()>;

    /// Create a directory and its parents; existing directories are fine.
    fn create_dir_all(&self, root: &Root, path: &RelPath) -> Result<()>;

    /// Create one directory (parents included), failing with `AlreadyExists`
    /// if the name is taken.
    fn create_dir(&self, root: &Root, path: &RelPath) -> Result<()>;

    /// Remove `path` only if it is an empty directory. Returns whether it
    /// was removed.
    fn remove_dir_if_empty(&self, root: &Root, path: &RelPath) -> Result<bool>;

    /// Create (or truncate) a file for writing, creating parents first.
    fn create_file(&self, root: &Root, path: &RelPath) -> Result<File>;

    /// Absolute location of `path`, for streaming responses.
    fn resolve(&self, root: &Root, path: &RelPath) -> PathBuf;

    /// Whether anything exists at `path`.
    fn exists(&self, root: &Root, path: &RelPath) -> bool {
        self.metadata(root, path).is_ok()
    }

    /// Remove `start` and then each parent while they are empty, stopping
    /// at (and never removing) the root.
    fn prune_empty_dirs(&self, root: &Root, start: &RelPath) -> Result<usize> {
        let mut removed = 0;
        let mut current = start.clone();
        while !current.is_root() {
            if !self.remove_dir_if_empty(root, &current)? {
                break;
            }
            removed += 1;
            current = match current.parent() {
                Some(parent) => parent,
                None => break,
            };
        }
        Ok(removed)
    }
}

/// [`ObjectStore`] backed by two directories on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    download_root: PathBuf,
    pending_root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store, creating both roots if they don't exist.
    pub fn new(download_root: impl Into<PathBuf>, pending_root: impl Into<PathBuf>) -> Result<Self> {
        let download_root = download_root.into();
        let pending_root = pending_root.into();
        fs::create_dir_all(&download_root)?;
        fs::create_dir_all(&pending_root)?;

        Ok(Self {
            download_root,
            pending_root,
        })
    }

    /// Directory holding published files.
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Directory holding every user's pending subtree.
    pub fn pending_root(&self) -> &Path {
        &self.pending_root
    }

    fn root_path(&self, root: &Root) -> PathBuf {
        match root {
            Root::Download => self.download_root.clone(),
            // Owner is validated by Root::pending; join drops any stray
            // traversal segments if the variant was built by hand.
            Root::Pending(owner) => self
                .pending_root
                .join(RelPath::root().join(owner).to_path_buf()),
        }
    }

    fn entry_from(path: RelPath, meta: &fs::Metadata) -> Entry {
        Entry {
            name: path.file_name().unwrap_or(".").to_string(),
            is_dir: meta.is_dir(),
            size: if meta.is_dir() { 0 } else { meta.len() },
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            path,
        }
    }

    fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
        let mut reader = File::open(from)?;
        let mut writer = File::create(to)?;
        io::copy(&mut reader, &mut writer)?;
        let permissions = fs::metadata(from)?.permissions();
        fs::set_permissions(to, permissions)
    }

    /// Symbolic links inside the tree are skipped, never followed.
    fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(from)?;
        if meta.file_type().is_symlink() {
            tracing::debug!("Skipping symbolic link {}", from.display());
            return Ok(());
        }
        if !meta.is_dir() {
            return Self::copy_file(from, to);
        }

        fs::create_dir_all(to)?;
        for child in fs::read_dir(from)? {
            let child = child?;
            Self::copy_tree(&child.path(), &to.join(child.file_name()))?;
        }
        Ok(())
    }
}

/// Listing order: directories first, then newest first, unknown times last.
fn listing_order(a: &Entry, b: &Entry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| match (&a.modified, &b.modified) {
            (Some(x), Some(y)) => y.cmp(x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.name.cmp(&b.name))
}

impl ObjectStore for LocalObjectStore {
    fn metadata(&self, root: &Root, path: &RelPath) -> Result<Entry> {
        let full = self.resolve(root, path);
        let meta = fs::metadata(&full).map_err(|e| StageboxError::from_io(e, path.as_string()))?;
        Ok(Self::entry_from(path.clone(), &meta))
    }

    fn list(&self, root: &Root, dir: &RelPath) -> Result<Vec<Entry>> {
        let full = self.resolve(root, dir);
        let reader = fs::read_dir(&full).map_err(|e| StageboxError::from_io(e, dir.as_string()))?;

        let mut entries = Vec::new();
        for item in reader.flatten() {
            let name = item.file_name().to_string_lossy().into_owned();
            let path = dir.join(&name);
            match item.metadata() {
                Ok(meta) => entries.push(Self::entry_from(path, &meta)),
                Err(e) => {
                    tracing::debug!("Unreadable metadata for {}: {}", path, e);
                    entries.push(Entry {
                        name,
                        path,
                        is_dir: false,
                        size: 0,
                        modified: None,
                    });
                }
            }
        }

        entries.sort_by(listing_order);
        Ok(entries)
    }

    fn walk_files(&self, root: &Root, dir: &RelPath) -> Result<Vec<Entry>> {
        let mut files = Vec::new();
        let mut stack = vec![dir.clone()];

        while let Some(current) = stack.pop() {
            let full = self.resolve(root, &current);
            let reader = match fs::read_dir(&full) {
                Ok(reader) => reader,
                Err(e) if current == *dir => {
                    return Err(StageboxError::from_io(e, current.as_string()))
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory {}: {}", current, e);
                    continue;
                }
            };

            for item in reader.flatten() {
                let name = item.file_name().to_string_lossy().into_owned();
                let path = current.join(&name);
                let Ok(file_type) = item.file_type() else {
                    continue;
                };
                if file_type.is_dir() {
                    stack.push(path);
                } else if let Ok(meta) = item.metadata() {
                    files.push(Self::entry_from(path, &meta));
                }
            }
        }

        files.sort_by(|a, b| a.path.as_string().cmp(&b.path.as_string()));
        Ok(files)
    }

    fn walk_dirs(&self, root: &Root) -> Result<Vec<RelPath>> {
        let mut dirs = Vec::new();
        let mut stack = vec![RelPath::root()];

        while let Some(current) = stack.pop() {
            let Ok(reader) = fs::read_dir(self.resolve(root, &current)) else {
                continue;
            };
            for item in reader.flatten() {
                if item.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    let path = current.join(&item.file_name().to_string_lossy());
                    dirs.push(path.clone());
                    stack.push(path);
                }
            }
        }

        dirs.sort_by_key(RelPath::as_string);
        Ok(dirs)
    }

    fn pending_owners(&self) -> Result<Vec<String>> {
        let reader = match fs::read_dir(&self.pending_root) {
            Ok(reader) => reader,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut owners: Vec<String> = reader
            .flatten()
            .filter(|item| item.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|item| item.file_name().to_string_lossy().into_owned())
            .collect();
        owners.sort();
        Ok(owners)
    }

    fn rename(
        &self,
        from_root: &Root,
        from: &RelPath,
        to_root: &Root,
        to: &RelPath,
    ) -> Result<()> {
        let source = self.resolve(from_root, from);
        let target = self.resolve(to_root, to);

        fs::symlink_metadata(&source).map_err(|e| StageboxError::from_io(e, from.as_string()))?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&source, &target).map_err(|e| StageboxError::from_io(e, from.as_string()))
    }

    fn copy(&self, from_root: &Root, from: &RelPath, to_root: &Root, to: &RelPath) -> Result<()> {
        let source = self.resolve(from_root, from);
        let target = self.resolve(to_root, to);

        let meta = fs::symlink_metadata(&source)
            .map_err(|e| StageboxError::from_io(e, from.as_string()))?;
        if meta.file_type().is_symlink() {
            return Err(StageboxError::Validation(format!(
                "{from} is a symbolic link"
            )));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::copy_tree(&source, &target)?;
        Ok(())
    }

    fn delete(&self, root: &Root, path: &RelPath) -> Result<()> {
        let full = self.resolve(root, path);
        let meta =
            fs::symlink_metadata(&full).map_err(|e| StageboxError::from_io(e, path.as_string()))?;

        if meta.is_dir() {
            fs::remove_dir_all(&full)?;
        } else {
            fs::remove_file(&full)?;
        }
        Ok(())
    }

    fn create_dir_all(&self, root: &Root, path: &RelPath) -> Result<()> {
        fs::create_dir_all(self.resolve(root, path))?;
        Ok(())
    }

    fn create_dir(&self, root: &Root, path: &RelPath) -> Result<()> {
        let full = self.resolve(root, path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir(&full).map_err(|e| StageboxError::from_io(e, path.as_string()))
    }

    fn remove_dir_if_empty(&self, root: &Root, path: &RelPath) -> Result<bool> {
        let full = self.resolve(root, path);
        let mut reader = match fs::read_dir(&full) {
            Ok(reader) => reader,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if reader.next().is_some() {
            return Ok(false);
        }
        fs::remove_dir(&full)?;
        Ok(true)
    }

    fn create_file(&self, root: &Root, path: &RelPath) -> Result<File> {
        let full = self.resolve(root, path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(File::create(full)?)
    }

    fn resolve(&self, root: &Root, path: &RelPath) -> PathBuf {
        self.root_path(root).join(path.to_path_buf())
    }
}

/// Pick a name for `filename` inside `dir` that nothing occupies yet.
///
/// Returns `filename` unchanged when free, otherwise inserts `_1`, `_2`, ...
/// before the extension (`report.txt` -> `report_1.txt`, `.env` -> `.env_1`).
pub fn unique_name(store: &dyn ObjectStore, root: &Root, dir: &RelPath, filename: &str) -> String {
    if !store.exists(root, &dir.join(filename)) {
        return filename.to_string();
    }

    let as_path = Path::new(filename);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n: u64 = 1;
    loop {
        let candidate = format!("{stem}_{n}{ext}");
        if !store.exists(root, &dir.join(&candidate)) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalObjectStore) {
        let temp = TempDir::new().unwrap();
        let store =
            LocalObjectStore::new(temp.path().join("downloads"), temp.path().join("pending"))
                .unwrap();
        (temp, store)
    }

    fn rel(s: &str) -> RelPath {
        RelPath::parse(s).unwrap()
    }

    fn write(store: &LocalObjectStore, root: &Root, path: &str, content: &[u8]) {
        let full = store.resolve(root, &rel(path));
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    fn set_mtime(store: &LocalObjectStore, root: &Root, path: &str, secs_ago: u64) {
        let full = store.resolve(root, &rel(path));
        let file = File::options().read(true).open(&full).unwrap();
        let when = SystemTime::now() - Duration::from_secs(secs_ago);
        file.set_modified(when).unwrap();
    }

    #[test]
    fn test_new_creates_roots() {
        let (_temp, store) = setup();
        assert!(store.download_root().is_dir());
        assert!(store.pending_root().is_dir());
    }

    #[test]
    fn test_pending_root_validates_owner() {
        assert_eq!(Root::pending("alice").unwrap(), Root::Pending("alice".into()));
        assert!(Root::pending("../alice").is_err());
        assert!(Root::pending("a/b").is_err());
    }

    #[test]
    fn test_resolve_pending() {
        let (_temp, store) = setup();
        let path = store.resolve(&Root::Pending("bob".into()), &rel("docs/a.txt"));
        assert_eq!(path, store.pending_root().join("bob").join("docs").join("a.txt"));
    }

    #[test]
    fn test_list_directories_first_then_newest() {
        let (_temp, store) = setup();
        let root = Root::Download;
        store.create_dir(&root, &rel("old_dir")).unwrap();
        write(&store, &root, "new.txt", b"new");
        write(&store, &root, "older.txt", b"older");
        set_mtime(&store, &root, "old_dir", 3600);
        set_mtime(&store, &root, "older.txt", 60);

        let names: Vec<String> = store
            .list(&root, &RelPath::root())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["old_dir", "new.txt", "older.txt"]);
    }

    #[test]
    fn test_list_missing_dir() {
        let (_temp, store) = setup();
        let result = store.list(&Root::Download, &rel("nope"));
        assert!(matches!(result, Err(StageboxError::NotFound(_))));
    }

    #[test]
    fn test_metadata() {
        let (_temp, store) = setup();
        write(&store, &Root::Download, "docs/a.txt", b"hello");

        let entry = store.metadata(&Root::Download, &rel("docs/a.txt")).unwrap();
        assert_eq!(entry.name, "a.txt");
        assert_eq!(entry.size, 5);
        assert!(!entry.is_dir);
        assert!(store.metadata(&Root::Download, &rel("docs")).unwrap().is_dir);
        assert!(matches!(
            store.metadata(&Root::Download, &rel("docs/b.txt")),
            Err(StageboxError::NotFound(_))
        ));
    }

    #[test]
    fn test_walk_files_recurses() {
        let (_temp, store) = setup();
        let root = Root::Pending("alice".into());
        write(&store, &root, "a.txt", b"1");
        write(&store, &root, "docs/b.txt", b"22");
        write(&store, &root, "docs/deep/c.txt", b"333");

        let files = store.walk_files(&root, &RelPath::root()).unwrap();
        let paths: Vec<String> = files.iter().map(|f| f.path.as_string()).collect();
        assert_eq!(paths, vec!["a.txt", "docs/b.txt", "docs/deep/c.txt"]);

        let scoped = store.walk_files(&root, &rel("docs")).unwrap();
        assert_eq!(scoped.len(), 2);
    }

    #[test]
    fn test_walk_dirs() {
        let (_temp, store) = setup();
        store.create_dir_all(&Root::Download, &rel("b/c")).unwrap();
        store.create_dir_all(&Root::Download, &rel("a")).unwrap();
        write(&store, &Root::Download, "a/file.txt", b"x");

        let dirs: Vec<String> = store
            .walk_dirs(&Root::Download)
            .unwrap()
            .iter()
            .map(RelPath::as_string)
            .collect();
        assert_eq!(dirs, vec!["a", "b", "b/c"]);
    }

    #[test]
    fn test_pending_owners() {
        let (_temp, store) = setup();
        write(&store, &Root::Pending("zoe".into()), "x.txt", b"x");
        write(&store, &Root::Pending("alice".into()), "y.txt", b"y");
        fs::write(store.pending_root().join("stray.txt"), b"not an owner").unwrap();

        assert_eq!(store.pending_owners().unwrap(), vec!["alice", "zoe"]);
    }

    #[test]
    fn test_rename_across_roots_creates_parent() {
        let (_temp, store) = setup();
        let pending = Root::Pending("alice".into());
        write(&store, &pending, "docs/a.txt", b"data");

        store
            .rename(&pending, &rel("docs/a.txt"), &Root::Download, &rel("new/dir/a.txt"))
            .unwrap();

        assert!(!store.exists(&pending, &rel("docs/a.txt")));
        let moved = store.resolve(&Root::Download, &rel("new/dir/a.txt"));
        assert_eq!(fs::read(moved).unwrap(), b"data");
    }

    #[test]
    fn test_rename_missing_source() {
        let (_temp, store) = setup();
        let result = store.rename(
            &Root::Pending("alice".into()),
            &rel("gone.txt"),
            &Root::Download,
            &rel("gone.txt"),
        );
        assert!(matches!(result, Err(StageboxError::NotFound(_))));
        assert!(!store.exists(&Root::Download, &rel("gone.txt")));
    }

    #[test]
    fn test_copy_file_preserves_content() {
        let (_temp, store) = setup();
        write(&store, &Root::Download, "a.txt", b"content");

        store
            .copy(&Root::Download, &rel("a.txt"), &Root::Download, &rel("b/a.txt"))
            .unwrap();

        let copied = store.resolve(&Root::Download, &rel("b/a.txt"));
        assert_eq!(fs::read(copied).unwrap(), b"content");
        assert!(store.exists(&Root::Download, &rel("a.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_file_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, store) = setup();
        write(&store, &Root::Download, "run.sh", b"#!/bin/sh\n");
        let source = store.resolve(&Root::Download, &rel("run.sh"));
        fs::set_permissions(&source, fs::Permissions::from_mode(0o751)).unwrap();

        store
            .copy(&Root::Download, &rel("run.sh"), &Root::Download, &rel("copy.sh"))
            .unwrap();

        let copied = store.resolve(&Root::Download, &rel("copy.sh"));
        let mode = fs::metadata(copied).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o751);
    }

    #[test]
    fn test_copy_directory_recursive() {
        let (_temp, store) = setup();
        write(&store, &Root::Download, "src/a.txt", b"a");
        write(&store, &Root::Download, "src/sub/b.txt", b"b");
        store.create_dir_all(&Root::Download, &rel("src/empty")).unwrap();

        store
            .copy(&Root::Download, &rel("src"), &Root::Download, &rel("dst"))
            .unwrap();

        assert!(store.exists(&Root::Download, &rel("dst/a.txt")));
        assert!(store.exists(&Root::Download, &rel("dst/sub/b.txt")));
        assert!(store.metadata(&Root::Download, &rel("dst/empty")).unwrap().is_dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_skips_symlinks() {
        let (temp, store) = setup();
        fs::write(temp.path().join("secret.txt"), b"outside").unwrap();
        write(&store, &Root::Download, "src/a.txt", b"a");
        let src = store.resolve(&Root::Download, &rel("src"));
        std::os::unix::fs::symlink(temp.path().join("secret.txt"), src.join("leak.txt")).unwrap();
        std::os::unix::fs::symlink(&src, src.join("loop")).unwrap();

        store
            .copy(&Root::Download, &rel("src"), &Root::Download, &rel("dst"))
            .unwrap();

        assert!(store.exists(&Root::Download, &rel("dst/a.txt")));
        let dst = store.resolve(&Root::Download, &rel("dst"));
        assert!(fs::symlink_metadata(dst.join("leak.txt")).is_err());
        assert!(fs::symlink_metadata(dst.join("loop")).is_err());

        let result = store.copy(
            &Root::Download,
            &rel("src/leak.txt"),
            &Root::Download,
            &rel("leak.txt"),
        );
        assert!(matches!(result, Err(StageboxError::Validation(_))));
        assert!(!store.exists(&Root::Download, &rel("leak.txt")));
    }

    #[test]
    fn test_delete_file_and_dir() {
        let (_temp, store) = setup();
        write(&store, &Root::Download, "a.txt", b"a");
        write(&store, &Root::Download, "dir/b.txt", b"b");

        store.delete(&Root::Download, &rel("a.txt")).unwrap();
        store.delete(&Root::Download, &rel("dir")).unwrap();

        assert!(!store.exists(&Root::Download, &rel("a.txt")));
        assert!(!store.exists(&Root::Download, &rel("dir")));
    }

    #[test]
    fn test_delete_missing() {
        let (_temp, store) = setup();
        let result = store.delete(&Root::Download, &rel("missing"));
        assert!(matches!(result, Err(StageboxError::NotFound(_))));
    }

    #[test]
    fn test_create_dir_already_exists() {
        let (_temp, store) = setup();
        store.create_dir(&Root::Download, &rel("docs")).unwrap();
        let result = store.create_dir(&Root::Download, &rel("docs"));
        assert!(matches!(result, Err(StageboxError::AlreadyExists(_))));

        // The idempotent variant is fine with it.
        store.create_dir_all(&Root::Download, &rel("docs")).unwrap();
    }

    #[test]
    fn test_prune_empty_dirs_stops_at_root() {
        let (_temp, store) = setup();
        let root = Root::Pending("alice".into());
        store.create_dir_all(&root, &rel("a/b/c")).unwrap();
        write(&store, &root, "keep.txt", b"k");

        let removed = store.prune_empty_dirs(&root, &rel("a/b/c")).unwrap();
        assert_eq!(removed, 3);
        assert!(!store.exists(&root, &rel("a")));
        assert!(store.exists(&root, &RelPath::root()));
    }

    #[test]
    fn test_prune_empty_dirs_keeps_non_empty() {
        let (_temp, store) = setup();
        let root = Root::Pending("alice".into());
        write(&store, &root, "a/other.txt", b"o");
        store.create_dir_all(&root, &rel("a/b")).unwrap();

        let removed = store.prune_empty_dirs(&root, &rel("a/b")).unwrap();
        assert_eq!(removed, 1);
        assert!(store.exists(&root, &rel("a/other.txt")));
    }

    #[test]
    fn test_create_file_creates_parents() {
        use std::io::Write;

        let (_temp, store) = setup();
        let root = Root::Pending("bob".into());
        let mut file = store.create_file(&root, &rel("x/y/z.bin")).unwrap();
        file.write_all(b"zz").unwrap();
        drop(file);

        assert_eq!(store.metadata(&root, &rel("x/y/z.bin")).unwrap().size, 2);
    }

    #[test]
    fn test_unique_name_sequence() {
        let (_temp, store) = setup();
        let dir = rel("docs");
        assert_eq!(unique_name(&store, &Root::Download, &dir, "report.txt"), "report.txt");

        write(&store, &Root::Download, "docs/report.txt", b"1");
        assert_eq!(unique_name(&store, &Root::Download, &dir, "report.txt"), "report_1.txt");

        write(&store, &Root::Download, "docs/report_1.txt", b"2");
        assert_eq!(unique_name(&store, &Root::Download, &dir, "report.txt"), "report_2.txt");
    }

    #[test]
    fn test_unique_name_skips_existing_suffixes() {
        let (_temp, store) = setup();
        for name in ["a.tar.gz", "a.tar_1.gz", "a.tar_2.gz", "a.tar_3.gz"] {
            write(&store, &Root::Download, name, b"x");
        }
        assert_eq!(
            unique_name(&store, &Root::Download, &RelPath::root(), "a.tar.gz"),
            "a.tar_4.gz"
        );
    }

    #[test]
    fn test_unique_name_dotfile_and_no_extension() {
        let (_temp, store) = setup();
        write(&store, &Root::Download, ".env", b"x");
        write(&store, &Root::Download, "README", b"x");
        assert_eq!(unique_name(&store, &Root::Download, &RelPath::root(), ".env"), ".env_1");
        assert_eq!(unique_name(&store, &Root::Download, &RelPath::root(), "README"), "README_1");
    }
}
