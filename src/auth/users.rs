//! User directory backed by the configuration file.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use super::password::{hash_password, validate_password, verify_password, PasswordError};
use super::role::Role;
use super::session::SessionError;
use super::validation::validate_username;
use crate::config::{Config, UserRecord};
use crate::{Result, StageboxError};

/// The built-in administrator account, which can never be deleted.
pub const ADMIN_USERNAME: &str = "admin";

/// Input for [`UserDirectory::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Plaintext password (hashed before storage).
    pub password: String,
    /// Role.
    pub role: Role,
    /// Upload limit in bytes; `None` uses the role default.
    pub max_file_size: Option<u64>,
}

/// User lookup and management.
pub trait UserDirectory: Send + Sync {
    /// Fetch a user record.
    fn get(&self, username: &str) -> Option<UserRecord>;

    /// All user records, in stored order.
    fn list(&self) -> Vec<UserRecord>;

    /// Check a username and password.
    fn authenticate(&self, username: &str, password: &str) -> Result<UserRecord>;

    /// Create a user and persist the configuration.
    fn add_user(&self, user: NewUser) -> Result<()>;

    /// Delete a user and persist the configuration.
    fn delete_user(&self, username: &str) -> Result<()>;

    /// Replace a user's password and persist the configuration.
    fn change_password(&self, username: &str, new_password: &str) -> Result<()>;
}

fn password_error(err: PasswordError) -> StageboxError {
    match err {
        e @ (PasswordError::TooShort | PasswordError::TooLong) => {
            StageboxError::Validation(e.to_string())
        }
        other => StageboxError::Auth(other.to_string()),
    }
}

/// [`UserDirectory`] that keeps the whole [`Config`] in memory and rewrites
/// the JSON file after each mutation.
///
/// Mutations run under one lock: the in-memory copy is only replaced once
/// the file write succeeded.
#[derive(Debug)]
pub struct ConfigUserDirectory {
    config: Mutex<Config>,
    path: PathBuf,
}

impl ConfigUserDirectory {
    /// Wrap a loaded configuration that persists to `path`.
    pub fn new(config: Config, path: impl Into<PathBuf>) -> Self {
        Self {
            config: Mutex::new(config),
            path: path.into(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy, save it, then swap it in.
    fn mutate<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Config) -> Result<()>,
    {
        let mut current = self.lock();
        let mut next = current.clone();
        change(&mut next)?;
        next.save(&self.path).map_err(|e| {
            warn!("Failed to save user configuration: {}", e);
            match e {
                e @ StageboxError::ConfigPersist(_) => e,
                other => StageboxError::ConfigPersist(other.to_string()),
            }
        })?;
        *current = next;
        Ok(())
    }

    /// Create the `admin` account if it is missing.
    ///
    /// Returns the generated password when an account was created.
    pub fn ensure_admin(&self) -> Result<Option<String>> {
        if self.get(ADMIN_USERNAME).is_some() {
            return Ok(None);
        }

        let password = generate_password();
        let hash = hash_password(&password).map_err(password_error)?;
        self.mutate(|config| {
            config.users.push(UserRecord {
                username: ADMIN_USERNAME.to_string(),
                password_hash: hash,
                password: None,
                role: Role::Admin,
                max_file_size: Some(0),
            });
            Ok(())
        })?;
        Ok(Some(password))
    }
}

/// Random 16-character alphanumeric password.
fn generate_password() -> String {
    use rand::distr::Alphanumeric;
    use rand::Rng;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

impl UserDirectory for ConfigUserDirectory {
    fn get(&self, username: &str) -> Option<UserRecord> {
        self.lock().user(username).cloned()
    }

    fn list(&self) -> Vec<UserRecord> {
        self.lock().users.clone()
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<UserRecord> {
        // Verify outside the lock.
        let record = self
            .get(username)
            .ok_or(SessionError::InvalidCredentials)?;

        verify_password(password, &record.password_hash)
            .map_err(|_| SessionError::InvalidCredentials)?;
        Ok(record)
    }

    fn add_user(&self, user: NewUser) -> Result<()> {
        validate_username(&user.username).map_err(|e| StageboxError::Validation(e.to_string()))?;
        validate_password(&user.password).map_err(password_error)?;
        let hash = hash_password(&user.password).map_err(password_error)?;

        self.mutate(|config| {
            if config.user(&user.username).is_some() {
                return Err(StageboxError::AlreadyExists(format!(
                    "user {}",
                    user.username
                )));
            }
            config.users.push(UserRecord {
                username: user.username.clone(),
                password_hash: hash,
                password: None,
                role: user.role,
                max_file_size: user.max_file_size,
            });
            Ok(())
        })?;

        info!(username = %user.username, role = %user.role, "User added");
        Ok(())
    }

    fn delete_user(&self, username: &str) -> Result<()> {
        if username == ADMIN_USERNAME {
            return Err(StageboxError::Forbidden(
                "the admin account cannot be deleted".to_string(),
            ));
        }

        self.mutate(|config| {
            let before = config.users.len();
            config.users.retain(|u| u.username != username);
            if config.users.len() == before {
                return Err(StageboxError::NotFound(format!("user {username}")));
            }
            Ok(())
        })?;

        info!(username = %username, "User deleted");
        Ok(())
    }

    fn change_password(&self, username: &str, new_password: &str) -> Result<()> {
        validate_password(new_password).map_err(password_error)?;
        let hash = hash_password(new_password).map_err(password_error)?;

        self.mutate(|config| {
            let user = config
                .users
                .iter_mut()
                .find(|u| u.username == username)
                .ok_or_else(|| StageboxError::NotFound(format!("user {username}")))?;
            user.password_hash = hash;
            Ok(())
        })?;

        info!(username = %username, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ConfigUserDirectory) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config").join("config.json");
        let users = ConfigUserDirectory::new(Config::default(), path);
        (temp, users)
    }

    fn new_user(name: &str, role: Role) -> NewUser {
        NewUser {
            username: name.to_string(),
            password: "password123".to_string(),
            role,
            max_file_size: None,
        }
    }

    #[test]
    fn test_add_and_authenticate() {
        let (_temp, users) = setup();
        users.add_user(new_user("alice", Role::Normal)).unwrap();

        let record = users.authenticate("alice", "password123").unwrap();
        assert_eq!(record.role, Role::Normal);
        assert!(record.password_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_authenticate_failures() {
        let (_temp, users) = setup();
        users.add_user(new_user("alice", Role::Normal)).unwrap();

        assert!(matches!(
            users.authenticate("alice", "wrong-password"),
            Err(StageboxError::Auth(_))
        ));
        assert!(matches!(
            users.authenticate("nobody", "password123"),
            Err(StageboxError::Auth(_))
        ));
    }

    #[test]
    fn test_add_persists_to_file() {
        let (temp, users) = setup();
        users.add_user(new_user("alice", Role::Test)).unwrap();

        let saved = Config::load(temp.path().join("config").join("config.json")).unwrap();
        let alice = saved.user("alice").unwrap();
        assert_eq!(alice.role, Role::Test);
        assert_ne!(alice.password_hash, "password123");
    }

    #[test]
    fn test_add_duplicate() {
        let (_temp, users) = setup();
        users.add_user(new_user("alice", Role::Normal)).unwrap();
        let result = users.add_user(new_user("alice", Role::Admin));
        assert!(matches!(result, Err(StageboxError::AlreadyExists(_))));
    }

    #[test]
    fn test_add_validates_input() {
        let (_temp, users) = setup();
        assert!(matches!(
            users.add_user(new_user("../evil", Role::Normal)),
            Err(StageboxError::Validation(_))
        ));

        let mut short = new_user("bob", Role::Normal);
        short.password = "short".to_string();
        assert!(matches!(
            users.add_user(short),
            Err(StageboxError::Validation(_))
        ));
        assert!(users.list().is_empty());
    }

    #[test]
    fn test_delete_user() {
        let (_temp, users) = setup();
        users.add_user(new_user("alice", Role::Normal)).unwrap();
        users.delete_user("alice").unwrap();
        assert!(users.get("alice").is_none());
        assert!(matches!(
            users.delete_user("alice"),
            Err(StageboxError::NotFound(_))
        ));
    }

    #[test]
    fn test_admin_cannot_be_deleted() {
        let (_temp, users) = setup();
        users.ensure_admin().unwrap();
        assert!(matches!(
            users.delete_user(ADMIN_USERNAME),
            Err(StageboxError::Forbidden(_))
        ));
        assert!(users.get(ADMIN_USERNAME).is_some());
    }

    #[test]
    fn test_change_password() {
        let (_temp, users) = setup();
        users.add_user(new_user("alice", Role::Normal)).unwrap();
        users.change_password("alice", "new-password-1").unwrap();

        assert!(users.authenticate("alice", "password123").is_err());
        assert!(users.authenticate("alice", "new-password-1").is_ok());
        assert!(matches!(
            users.change_password("ghost", "new-password-1"),
            Err(StageboxError::NotFound(_))
        ));
    }

    #[test]
    fn test_ensure_admin_once() {
        let (_temp, users) = setup();
        let password = users.ensure_admin().unwrap().unwrap();
        assert_eq!(password.len(), 16);

        let admin = users.authenticate(ADMIN_USERNAME, &password).unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(users.ensure_admin().unwrap().is_none());
    }

    #[test]
    fn test_failed_persist_keeps_memory_unchanged() {
        let temp = TempDir::new().unwrap();
        // A regular file where the config directory should be.
        let blocker = temp.path().join("config");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let users = ConfigUserDirectory::new(Config::default(), blocker.join("config.json"));

        let result = users.add_user(new_user("alice", Role::Normal));
        assert!(matches!(result, Err(StageboxError::ConfigPersist(_))));
        assert!(users.get("alice").is_none());
    }
}
