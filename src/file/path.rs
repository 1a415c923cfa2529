//! Lexical path sanitizing.
//!
//! Every path-like value taken from a request goes through [`RelPath::parse`]
//! before it is joined onto a root. Filenames that end up as a final path
//! segment go through [`sanitize_filename`].

use std::fmt;
use std::path::PathBuf;

use crate::{Result, StageboxError};

/// Characters replaced with `_` in filenames.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// A normalized path relative to a storage root.
///
/// Holds only plain segments: no `.`, no `..`, no empty segments. The root
/// itself is the empty path and displays as `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelPath {
    segments: Vec<String>,
}

impl RelPath {
    /// The root of a storage tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalize a user-supplied path.
    ///
    /// Both `/` and `\` separate segments, a leading separator is ignored,
    /// `.` is dropped and `..` pops the previous segment. A `..` that would
    /// climb above the root fails with [`StageboxError::InvalidPath`].
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.contains('\0') {
            return Err(StageboxError::InvalidPath(raw.replace('\0', "\\0")));
        }

        let mut segments: Vec<String> = Vec::new();
        for part in raw.split(['/', '\\']) {
            match part {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(StageboxError::InvalidPath(raw.to_string()));
                    }
                }
                other => segments.push(other.to_string()),
            }
        }

        Ok(Self { segments })
    }

    /// Parse a value that must name exactly one entry, such as a username.
    pub fn segment(raw: &str) -> Result<String> {
        let path = Self::parse(raw)?;
        match path.segments.as_slice() {
            [single] if single == raw.trim_matches(['/', '\\']) => Ok(single.clone()),
            _ => Err(StageboxError::InvalidPath(raw.to_string())),
        }
    }

    /// Whether this is the root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a single already-sanitized name.
    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            name.split(['/', '\\'])
                .filter(|s| !s.is_empty() && *s != "." && *s != "..")
                .map(str::to_string),
        );
        Self { segments }
    }

    /// Append another relative path.
    pub fn join_rel(&self, other: &RelPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// The containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// The last segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &RelPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// The path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Forward-slash form (`.` for the root).
    pub fn as_string(&self) -> String {
        if self.is_root() {
            ".".to_string()
        } else {
            self.segments.join("/")
        }
    }

    /// Relative filesystem path to be joined onto a root.
    pub fn to_path_buf(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Sanitize a filename for use as the last path segment.
///
/// Directory components are stripped, forbidden characters become `_`, and
/// a name that ends up empty is replaced by `file_<unix seconds>`.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if FORBIDDEN_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        format!("file_{}", chrono::Utc::now().timestamp())
    } else {
        cleaned.to_string()
    }
}
