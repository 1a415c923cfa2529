//! stagebox - self-hosted file sharing with an upload review queue.
//!
//! Administrators publish into a download root that anyone may browse.
//! Other users upload into their own pending tree, and an administrator
//! approves (moves into the download root) or rejects (deletes) each file.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use audit::{AuditLevel, AuditRecord, AuditSink, FileAuditLog, LogEntry, MemoryAuditSink};
pub use auth::{
    check_permission, hash_password, validate_password, verify_password, Action,
    ConfigUserDirectory, LoginLimiter, NewUser, PasswordError, PermissionError, Role, Session,
    SessionStore, UserDirectory,
};
pub use config::{Config, LoggingConfig, ServerConfig, UserRecord, DEFAULT_CONFIG_PATH};
pub use error::{Result, StageboxError};
pub use file::{LocalObjectStore, ObjectStore, RelPath, ReviewService, Root};
pub use web::WebServer;
