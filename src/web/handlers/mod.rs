//! HTTP handlers and the state they share.

pub mod admin;
pub mod auth;
pub mod files;
pub mod review;
pub mod users;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::audit::{AuditLevel, AuditRecord, AuditSink};
use crate::auth::{LoginLimiter, Session, SessionStore, UserDirectory};
use crate::config::ServerConfig;
use crate::file::{ObjectStore, ReviewService};

pub use admin::*;
pub use auth::*;
pub use files::*;
pub use review::*;
pub use users::*;

/// Shared application state.
pub struct AppState {
    /// Server section of the configuration (roots, log location).
    pub server: ServerConfig,
    /// Live sessions.
    pub sessions: SessionStore,
    /// User accounts.
    pub users: Arc<dyn UserDirectory>,
    /// Download and pending roots.
    pub store: Arc<dyn ObjectStore>,
    /// Pending-upload workflow over `store`.
    pub review: ReviewService,
    /// Audit trail.
    pub audit: Arc<dyn AuditSink>,
    /// Failed-login tracking.
    limiter: Mutex<LoginLimiter>,
    /// Process start, for uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        server: ServerConfig,
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn ObjectStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            server,
            sessions: SessionStore::new(),
            users,
            review: ReviewService::new(store.clone()),
            store,
            audit,
            limiter: Mutex::new(LoginLimiter::new()),
            started_at: Instant::now(),
        }
    }

    /// Replace the session store (e.g. a shorter TTL).
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    /// Replace the login limiter.
    pub fn with_limiter(mut self, limiter: LoginLimiter) -> Self {
        self.limiter = Mutex::new(limiter);
        self
    }

    /// Lock the login limiter.
    pub fn limiter(&self) -> MutexGuard<'_, LoginLimiter> {
        self.limiter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write an audit record.
    pub fn audit(
        &self,
        level: AuditLevel,
        session: Option<&Session>,
        action: &str,
        details: impl Into<String>,
    ) {
        self.audit
            .record(AuditRecord::new(level, session, action, details));
    }
}

/// State handle passed to every handler.
pub type SharedState = Arc<AppState>;
