//! Configuration module for stagebox.
//!
//! The whole configuration, user records included, lives in one JSON file
//! (`config/config.json` by default). User management rewrites that file in
//! full after every mutation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::auth::{hash_password, Role};
use crate::{Result, StageboxError};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

/// A user account as persisted in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Login name (unique key).
    pub username: String,
    /// Argon2id PHC string.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_hash: String,
    /// Plaintext password from configs written by older releases.
    ///
    /// Consumed by [`Config::migrate_legacy_passwords`] and never written back.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Account role.
    #[serde(default)]
    pub role: Role,
    /// Per-user upload limit in bytes (0 = unlimited). Absent means the
    /// role default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTPS port (TLS termination is handled outside this crate).
    #[serde(default = "default_https_port")]
    pub https_port: u16,
    /// TLS certificate path.
    #[serde(default = "default_cert_file")]
    pub cert_file: String,
    /// TLS key path.
    #[serde(default = "default_key_file")]
    pub key_file: String,
    /// Root of published files.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    /// Root of per-user staged uploads.
    #[serde(default = "default_pending_dir")]
    pub pending_dir: String,
    /// Directory holding the audit log.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// Audit log file name inside `log_dir`.
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_port() -> u16 {
    9980
}

fn default_https_port() -> u16 {
    9443
}

fn default_cert_file() -> String {
    "./ssl/cert.pem".to_string()
}

fn default_key_file() -> String {
    "./ssl/key.pem".to_string()
}

fn default_download_dir() -> String {
    "./downloads".to_string()
}

fn default_pending_dir() -> String {
    "./pending".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_file() -> String {
    "server.log".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            https_port: default_https_port(),
            cert_file: default_cert_file(),
            key_file: default_key_file(),
            download_dir: default_download_dir(),
            pending_dir: default_pending_dir(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
        }
    }
}

impl ServerConfig {
    /// Full path of the audit log file.
    pub fn log_path(&self) -> PathBuf {
        Path::new(&self.log_dir).join(&self.log_file)
    }
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// User accounts.
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            StageboxError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Load configuration, returning `None` only when the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StageboxError::Config(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Parse configuration from a JSON string.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| StageboxError::Config(format!("failed to parse config: {e}")))
    }

    /// Write the configuration as pretty-printed JSON, creating the parent
    /// directory if needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StageboxError::ConfigPersist(e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StageboxError::ConfigPersist(e.to_string()))?;
        fs::write(path, json + "\n").map_err(|e| StageboxError::ConfigPersist(e.to_string()))
    }

    /// Hash any plaintext passwords left over from older configs.
    ///
    /// Returns `true` when at least one record changed and the file should be
    /// rewritten.
    pub fn migrate_legacy_passwords(&mut self) -> Result<bool> {
        let mut changed = false;
        for user in &mut self.users {
            if let Some(plain) = user.password.take() {
                if user.password_hash.is_empty() {
                    user.password_hash = hash_password(&plain)
                        .map_err(|e| StageboxError::Config(e.to_string()))?;
                }
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Find a user record by name.
    pub fn user(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }
}
