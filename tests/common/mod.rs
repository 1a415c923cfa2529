//! Shared harness for the HTTP integration tests.
//!
//! Every test gets its own temporary download, pending and log
//! directories plus a configuration file with three accounts.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use axum_extra::extract::cookie::Cookie;
use axum_test::{TestResponse, TestServer};
use tempfile::TempDir;

use stagebox::auth::{hash_password, Role};
use stagebox::web::{create_router, AppState};
use stagebox::{
    Config, ConfigUserDirectory, FileAuditLog, LocalObjectStore, ServerConfig, UserRecord,
};

pub const ADMIN: (&str, &str) = ("admin", "admin-password");
pub const NORMAL: (&str, &str) = ("normaluser", "normal-password");
pub const TESTER: (&str, &str) = ("tester", "tester-password");

/// A running app over temporary directories.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub temp: TempDir,
}

fn user(name: &str, password: &str, role: Role, max_file_size: Option<u64>) -> UserRecord {
    UserRecord {
        username: name.to_string(),
        password_hash: hash_password(password).expect("hash password"),
        password: None,
        role,
        max_file_size,
    }
}

impl TestApp {
    /// Build an app; `tester_quota` overrides the test account's limit and
    /// `customize` may swap parts of the state before the server starts.
    pub fn build(tester_quota: Option<u64>, customize: impl FnOnce(AppState) -> AppState) -> Self {
        Self::build_with_quotas(0, tester_quota, customize)
    }

    fn build_with_quotas(
        admin_quota: u64,
        tester_quota: Option<u64>,
        customize: impl FnOnce(AppState) -> AppState,
    ) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path();

        let server_config = ServerConfig {
            port: 0,
            download_dir: root.join("downloads").display().to_string(),
            pending_dir: root.join("pending").display().to_string(),
            log_dir: root.join("logs").display().to_string(),
            ..ServerConfig::default()
        };
        let config = Config {
            users: vec![
                user(ADMIN.0, ADMIN.1, Role::Admin, Some(admin_quota)),
                user(NORMAL.0, NORMAL.1, Role::Normal, None),
                user(TESTER.0, TESTER.1, Role::Test, tester_quota),
            ],
            server: server_config.clone(),
            ..Config::default()
        };
        let config_path = root.join("config").join("config.json");
        config.save(&config_path).expect("save config");

        let store = LocalObjectStore::new(&server_config.download_dir, &server_config.pending_dir)
            .expect("create roots");
        let audit = FileAuditLog::open(server_config.log_path()).expect("open audit log");
        let users = ConfigUserDirectory::new(config, &config_path);

        let state = Arc::new(customize(AppState::new(
            server_config,
            Arc::new(users),
            Arc::new(store),
            Arc::new(audit),
        )));
        let server = TestServer::new(create_router(state.clone())).expect("test server");

        Self {
            server,
            state,
            temp,
        }
    }

    pub fn with_tester_quota(tester_quota: Option<u64>) -> Self {
        Self::build(tester_quota, |state| state)
    }

    /// An app whose admin account is capped at `admin_quota` bytes.
    pub fn with_admin_quota(admin_quota: u64) -> Self {
        Self::build_with_quotas(admin_quota, None, |state| state)
    }

    pub fn new() -> Self {
        Self::with_tester_quota(None)
    }

    pub fn download_root(&self) -> PathBuf {
        self.temp.path().join("downloads")
    }

    pub fn pending_root(&self) -> PathBuf {
        self.temp.path().join("pending")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config").join("config.json")
    }

    /// Log in and return the session cookie.
    pub async fn login(&self, (username, password): (&str, &str)) -> Cookie<'static> {
        let response = self
            .server
            .post("/login")
            .form(&[("username", username), ("password", password)])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        response.cookie("session_id")
    }
}

/// Write `content` at `root/rel`, creating parents.
pub fn put(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create parents");
    std::fs::write(path, content).expect("write file");
}

/// `Location` header of a redirect.
pub fn location(response: &TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .expect("ascii location")
        .to_string()
}

/// Assert a flash redirect to `page` with the given outcome.
pub fn assert_flash(response: &TestResponse, page: &str, kind: &str) -> String {
    response.assert_status(StatusCode::FOUND);
    let location = location(response);
    assert!(
        location.starts_with(&format!("{page}?")),
        "unexpected redirect {location}"
    );
    assert!(
        location.ends_with(&format!("type={kind}")),
        "unexpected outcome in {location}"
    );
    location
}
