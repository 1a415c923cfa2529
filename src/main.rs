use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use stagebox::web::AppState;
use stagebox::{
    Config, ConfigUserDirectory, FileAuditLog, LocalObjectStore, WebServer, DEFAULT_CONFIG_PATH,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let mut config = match Config::load_or_default(DEFAULT_CONFIG_PATH) {
        Ok(Some(config)) => config,
        Ok(None) => {
            eprintln!("{DEFAULT_CONFIG_PATH} not found, using default configuration.");
            Config::default()
        }
        Err(e) => {
            eprintln!("Failed to load {DEFAULT_CONFIG_PATH}: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = stagebox::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        stagebox::logging::init_console_only(&config.logging.level);
    }

    match config.migrate_legacy_passwords() {
        Ok(true) => {
            info!("Hashed plaintext passwords found in {}", DEFAULT_CONFIG_PATH);
            if let Err(e) = config.save(DEFAULT_CONFIG_PATH) {
                error!("Failed to save migrated configuration: {}", e);
                return ExitCode::FAILURE;
            }
        }
        Ok(false) => {}
        Err(e) => {
            error!("Failed to migrate legacy passwords: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let server = config.server.clone();

    let store = match LocalObjectStore::new(&server.download_dir, &server.pending_dir) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to prepare storage directories: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let audit = match FileAuditLog::open(server.log_path()) {
        Ok(audit) => audit,
        Err(e) => {
            error!("Failed to open audit log {}: {}", server.log_path().display(), e);
            return ExitCode::FAILURE;
        }
    };

    let users = ConfigUserDirectory::new(config, DEFAULT_CONFIG_PATH);
    match users.ensure_admin() {
        Ok(Some(password)) => {
            warn!("Created account 'admin' with password: {}", password);
            warn!("Change this password after the first login.");
        }
        Ok(None) => {}
        Err(e) => {
            error!("Failed to create the admin account: {}", e);
            return ExitCode::FAILURE;
        }
    }

    info!("stagebox v{}", env!("CARGO_PKG_VERSION"));
    info!("Download root: {}", server.download_dir);
    info!("Pending root: {}", server.pending_dir);
    info!("Audit log: {}", audit.path().display());

    let addr = SocketAddr::from(([0, 0, 0, 0], server.port));
    let state = AppState::new(
        server,
        Arc::new(users),
        Arc::new(store),
        Arc::new(audit),
    );

    if let Err(e) = WebServer::new(addr, Arc::new(state)).run().await {
        error!("Web server failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
