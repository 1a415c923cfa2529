//! Audit trail of user actions.
//!
//! One line per action, appended to `log_dir/log_file`:
//!
//! ```text
//! [2024-05-01 12:00:00] [success] [alice] [normal] upload docs/a.txt (12 bytes)
//! ```
//!
//! Anonymous requests are recorded as `anonymous` / `guest`.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::auth::Session;
use crate::Result;

/// Timestamp layout used in audit lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    /// Routine event.
    Info,
    /// Completed action.
    Success,
    /// Suspicious or refused request.
    Warning,
    /// Failed action.
    Error,
    /// Verbose detail.
    Debug,
}

impl AuditLevel {
    /// Lowercase name as written in the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "info",
            AuditLevel::Success => "success",
            AuditLevel::Warning => "warning",
            AuditLevel::Error => "error",
            AuditLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(AuditLevel::Info),
            "success" => Ok(AuditLevel::Success),
            "warning" | "warn" => Ok(AuditLevel::Warning),
            "error" => Ok(AuditLevel::Error),
            "debug" => Ok(AuditLevel::Debug),
            _ => Err(format!("unknown audit level: {s}")),
        }
    }
}

/// A single audited action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Local wall-clock time.
    pub timestamp: NaiveDateTime,
    /// Severity.
    pub level: AuditLevel,
    /// Username, or `anonymous`.
    pub actor: String,
    /// Role name, or `guest`.
    pub role: String,
    /// Single-word action name.
    pub action: String,
    /// Free-form details.
    pub details: String,
}

impl AuditRecord {
    /// Build a record for the current time, taking the actor from `session`.
    pub fn new(
        level: AuditLevel,
        session: Option<&Session>,
        action: &str,
        details: impl Into<String>,
    ) -> Self {
        let (actor, role) = match session {
            Some(s) => (s.username.clone(), s.role.as_str().to_string()),
            None => ("anonymous".to_string(), "guest".to_string()),
        };
        Self {
            timestamp: Local::now().naive_local(),
            level,
            actor,
            role,
            action: action.to_string(),
            details: details.into(),
        }
    }

    /// Format as one log line (without the newline).
    pub fn to_line(&self) -> String {
        // Keep one record per line whatever the details contain.
        let details = self.details.replace(['\r', '\n'], " ");
        format!(
            "[{}] [{}] [{}] [{}] {} {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.actor,
            self.role,
            self.action,
            details
        )
        .trim_end()
        .to_string()
    }
}

/// A log line as shown by the log viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Timestamp text as written.
    pub timestamp: String,
    /// Level text (`info` for unparseable lines).
    pub level: String,
    /// Username.
    pub user: String,
    /// Role name.
    pub role: String,
    /// Action name.
    pub action: String,
    /// Details, or the whole line when it didn't parse.
    pub details: String,
}

impl LogEntry {
    /// Parse `[ts] [level] [user] [role] action details`.
    ///
    /// Lines that don't follow the layout are kept verbatim as `info`
    /// entries.
    pub fn parse(line: &str) -> Self {
        Self::parse_structured(line).unwrap_or_else(|| LogEntry {
            timestamp: String::new(),
            level: AuditLevel::Info.as_str().to_string(),
            user: String::new(),
            role: String::new(),
            action: String::new(),
            details: line.to_string(),
        })
    }

    fn parse_structured(line: &str) -> Option<Self> {
        let mut rest = line;
        let mut fields = Vec::with_capacity(4);
        for _ in 0..4 {
            let trimmed = rest.trim_start();
            let inner = trimmed.strip_prefix('[')?;
            let end = inner.find(']')?;
            fields.push(inner[..end].to_string());
            rest = &inner[end + 1..];
        }

        let rest = rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        let (action, details) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let (action, details) = (action.to_string(), details.trim().to_string());

        let mut fields = fields.into_iter();
        Some(LogEntry {
            timestamp: fields.next()?,
            level: fields.next()?,
            user: fields.next()?,
            role: fields.next()?,
            action,
            details,
        })
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Store a record. Failures are reported through `tracing`, never to the
    /// caller.
    fn record(&self, record: AuditRecord);

    /// Most recent entries first, optionally filtered by level.
    fn recent(&self, limit: usize, level: Option<AuditLevel>) -> Result<Vec<LogEntry>>;
}

/// Mirror a record to the diagnostic log.
fn trace_record(record: &AuditRecord) {
    let (actor, action, details) = (&record.actor, &record.action, &record.details);
    match record.level {
        AuditLevel::Error => tracing::error!(%actor, %action, "{}", details),
        AuditLevel::Warning => tracing::warn!(%actor, %action, "{}", details),
        AuditLevel::Debug => tracing::debug!(%actor, %action, "{}", details),
        AuditLevel::Info | AuditLevel::Success => tracing::info!(%actor, %action, "{}", details),
    }
}

fn level_matches(entry: &LogEntry, level: Option<AuditLevel>) -> bool {
    level.map_or(true, |l| entry.level.eq_ignore_ascii_case(l.as_str()))
}

/// Bytes read per step when scanning the log backwards.
const TAIL_CHUNK: usize = 8 * 1024;

/// Lines of a file from last to first, read backwards in fixed-size chunks.
struct ReverseLines {
    file: File,
    pos: u64,
    chunk: usize,
    // Bytes before the earliest newline seen so far.
    head: Vec<u8>,
    lines: Vec<String>,
}

impl ReverseLines {
    fn new(file: File, len: u64, chunk: usize) -> Self {
        Self {
            file,
            pos: len,
            chunk,
            head: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let start = self.pos.saturating_sub(self.chunk as u64);
        let mut buf = vec![0u8; (self.pos - start) as usize];
        self.file.seek(SeekFrom::Start(start))?;
        self.file.read_exact(&mut buf)?;
        self.pos = start;

        buf.append(&mut self.head);
        let mut parts = buf.split(|b| *b == b'\n');
        self.head = parts.next().unwrap_or_default().to_vec();
        self.lines = parts
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect();
        Ok(())
    }
}

impl Iterator for ReverseLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.lines.pop() {
                return Some(Ok(line));
            }
            if self.pos == 0 {
                if self.head.is_empty() {
                    return None;
                }
                let first = std::mem::take(&mut self.head);
                return Some(Ok(String::from_utf8_lossy(&first).into_owned()));
            }
            if let Err(e) = self.fill() {
                self.pos = 0;
                self.head.clear();
                return Some(Err(e));
            }
        }
    }
}

/// Append-only audit file.
#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditLog {
    /// Open (or create) the log file, creating its directory first.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditSink for FileAuditLog {
    fn record(&self, record: AuditRecord) {
        trace_record(&record);

        let line = record.to_line() + "\n";
        if let Err(e) = self.lock().write_all(line.as_bytes()) {
            tracing::error!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }

    fn recent(&self, limit: usize, level: Option<AuditLevel>) -> Result<Vec<LogEntry>> {
        // Only lines complete at this point are read.
        let (file, len) = {
            let writer = self.lock();
            let len = writer.metadata()?.len();
            match File::open(&self.path) {
                Ok(file) => (file, len),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            }
        };

        let mut entries = Vec::new();
        if limit == 0 {
            return Ok(entries);
        }
        for line in ReverseLines::new(file, len, TAIL_CHUNK) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = LogEntry::parse(&line);
            if level_matches(&entry, level) {
                entries.push(entry);
                if entries.len() == limit {
                    break;
                }
            }
        }
        Ok(entries)
    }
}

/// In-memory sink, handy where no log directory exists.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        trace_record(&record);
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    fn recent(&self, limit: usize, level: Option<AuditLevel>) -> Result<Vec<LogEntry>> {
        Ok(self
            .records()
            .iter()
            .rev()
            .map(|r| LogEntry::parse(&r.to_line()))
            .filter(|e| level_matches(e, level))
            .take(limit)
            .collect())
    }
}
