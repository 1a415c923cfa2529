//! In-memory session table and login attempt limiting.
//!
//! Sessions live only in process memory: a restart logs everybody out.
//! Expired sessions are dropped lazily when they are looked up.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use thiserror::Error;
use tracing::{debug, info};

use super::role::Role;
use crate::StageboxError;

/// Session lifetime (24 hours), measured from creation.
pub const SESSION_DURATION_SECS: u64 = 24 * 60 * 60;

/// Failed logins allowed inside the window before a lockout.
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Window for counting failures, and the lockout length (5 minutes).
pub const LOCKOUT_DURATION_SECS: u64 = 5 * 60;

/// Random bytes per session token.
const TOKEN_BYTES: usize = 32;

/// Login errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Wrong username or password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Too many failed attempts.
    #[error("too many failed attempts, try again in {0} seconds")]
    AccountLocked(u64),
}

impl From<SessionError> for StageboxError {
    fn from(err: SessionError) -> Self {
        StageboxError::Auth(err.to_string())
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque token carried in the `session_id` cookie.
    pub token: String,
    /// Account name.
    pub username: String,
    /// Role at login time.
    pub role: Role,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Upload limit in bytes (0 = unlimited).
    pub max_upload_bytes: u64,
}

impl Session {
    /// Whether the session may perform administrative actions.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether the session is past its lifetime at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// Generate a hex token from the OS random source.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Concurrency-safe map from token to [`Session`].
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: chrono::Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a store with the default 24-hour lifetime.
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(SESSION_DURATION_SECS))
    }

    /// Create a store with a custom lifetime.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session and return it; the token goes into the cookie.
    pub fn create(&self, username: &str, role: Role, max_upload_bytes: u64) -> Session {
        self.create_at(username, role, max_upload_bytes, Utc::now())
    }

    /// Start a session with an explicit creation time.
    pub fn create_at(
        &self,
        username: &str,
        role: Role,
        max_upload_bytes: u64,
        now: DateTime<Utc>,
    ) -> Session {
        let session = Session {
            token: generate_token(),
            username: username.to_string(),
            role,
            created_at: now,
            max_upload_bytes,
        };

        self.lock().insert(session.token.clone(), session.clone());
        info!(username = %username, role = %role, "Session created");
        session
    }

    /// Look up a live session.
    pub fn resolve(&self, token: &str) -> Option<Session> {
        self.resolve_at(token, Utc::now())
    }

    /// Look up a session as of `now`, removing it if it has expired.
    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = self.lock();
        let session = sessions.get(token)?;

        if session.is_expired_at(now, self.ttl) {
            debug!(username = %session.username, "Session expired");
            sessions.remove(token);
            return None;
        }
        Some(session.clone())
    }

    /// Remove a session. Returns whether it existed.
    pub fn destroy(&self, token: &str) -> bool {
        let removed = self.lock().remove(token);
        if let Some(session) = &removed {
            info!(username = %session.username, "Session destroyed");
        }
        removed.is_some()
    }

    /// Remove every session belonging to `username`.
    pub fn destroy_user(&self, username: &str) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.username != username);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(username = %username, count = removed, "Sessions destroyed for user");
        }
        removed
    }

    /// Number of sessions that have not expired yet.
    pub fn count(&self) -> usize {
        let now = Utc::now();
        self.lock()
            .values()
            .filter(|s| !s.is_expired_at(now, self.ttl))
            .count()
    }
}

/// Result of a login attempt rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitResult {
    /// Login attempt is allowed.
    Allowed,
    /// Username is locked for the remaining duration.
    Locked(Duration),
}

/// Failed-login tracker keyed by lowercase username.
#[derive(Debug)]
pub struct LoginLimiter {
    failures: HashMap<String, Vec<Instant>>,
    max_attempts: u32,
    window: Duration,
    lockout: Duration,
}

impl Default for LoginLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginLimiter {
    /// 5 failures within 5 minutes lock the name for 5 minutes.
    pub fn new() -> Self {
        Self::with_config(MAX_LOGIN_ATTEMPTS, LOCKOUT_DURATION_SECS, LOCKOUT_DURATION_SECS)
    }

    /// Create a limiter with custom settings.
    pub fn with_config(max_attempts: u32, window_secs: u64, lockout_secs: u64) -> Self {
        Self {
            failures: HashMap::new(),
            max_attempts,
            window: Duration::from_secs(window_secs),
            lockout: Duration::from_secs(lockout_secs),
        }
    }

    /// Check whether `username` may attempt a login now.
    pub fn check(&mut self, username: &str) -> LimitResult {
        let now = Instant::now();
        let Some(failures) = self.failures.get_mut(&username.to_lowercase()) else {
            return LimitResult::Allowed;
        };
        failures.retain(|t| now.duration_since(*t) < self.window.max(self.lockout));

        if failures.len() < self.max_attempts as usize {
            return LimitResult::Allowed;
        }

        // Locked from the most recent failure.
        let Some(last) = failures.last().copied() else {
            return LimitResult::Allowed;
        };
        let elapsed = now.duration_since(last);
        if elapsed < self.lockout {
            LimitResult::Locked(self.lockout - elapsed)
        } else {
            failures.clear();
            LimitResult::Allowed
        }
    }

    /// Record a failed login.
    pub fn record_failure(&mut self, username: &str) {
        let now = Instant::now();
        let failures = self.failures.entry(username.to_lowercase()).or_default();
        failures.retain(|t| now.duration_since(*t) < self.window);
        failures.push(now);

        debug!(
            username = %username,
            attempt_count = failures.len(),
            "Recorded failed login attempt"
        );
    }

    /// Forget failures after a successful login.
    pub fn clear(&mut self, username: &str) {
        self.failures.remove(&username.to_lowercase());
    }

    /// Drop entries with no recent failures.
    pub fn cleanup(&mut self) {
        let now = Instant::now();
        let keep = self.window.max(self.lockout);
        self.failures.retain(|_, failures| {
            failures.retain(|t| now.duration_since(*t) < keep);
            !failures.is_empty()
        });
    }
}
