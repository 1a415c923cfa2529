//! Read-only administrator views.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::audit::AuditLevel;
use crate::file::{ObjectStore, RelPath, Root};
use crate::web::dto::{
    AdminSummaryResponse, ApiResponse, LogsQuery, LogsResponse, RootUsage, ServerInfoResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::SharedState;
use crate::web::middleware::RequireAdmin;

/// Entries returned by `/logs` when no limit is given.
pub const DEFAULT_LOG_LIMIT: usize = 500;

/// GET /admin - Dashboard counters.
pub async fn admin_dashboard(
    State(state): State<SharedState>,
    RequireAdmin(_session): RequireAdmin,
) -> Result<Json<ApiResponse<AdminSummaryResponse>>, ApiError> {
    Ok(Json(ApiResponse::new(AdminSummaryResponse {
        pending_files: state.review.pending_count()?,
        users: state.users.list().len(),
        active_sessions: state.sessions.count(),
    })))
}

fn usage(store: &dyn ObjectStore, root: &Root) -> RootUsage {
    let location = store.resolve(root, &RelPath::root()).display().to_string();
    match store.walk_files(root, &RelPath::root()) {
        Ok(files) => RootUsage {
            location,
            files: files.len(),
            bytes: files.iter().map(|f| f.size).sum(),
        },
        Err(e) => {
            tracing::warn!("Failed to measure {}: {}", location, e);
            RootUsage {
                location,
                ..RootUsage::default()
            }
        }
    }
}

/// Total usage of every owner's pending tree.
fn pending_usage(store: &dyn ObjectStore, location: String) -> RootUsage {
    let mut total = RootUsage {
        location,
        ..RootUsage::default()
    };
    let owners = store.pending_owners().unwrap_or_else(|e| {
        tracing::warn!("Failed to list pending owners: {}", e);
        Vec::new()
    });
    for owner in owners {
        let Ok(root) = Root::pending(&owner) else {
            continue;
        };
        let owner_usage = usage(store, &root);
        total.files += owner_usage.files;
        total.bytes += owner_usage.bytes;
    }
    total
}

/// GET /info - Version, host and storage figures.
pub async fn server_info(
    State(state): State<SharedState>,
    RequireAdmin(_session): RequireAdmin,
) -> Json<ApiResponse<ServerInfoResponse>> {
    let store = state.store.as_ref();
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    Json(ApiResponse::new(ServerInfoResponse {
        version: format!("v{}", env!("CARGO_PKG_VERSION")),
        uptime_secs: state.started_at.elapsed().as_secs(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpus,
        port: state.server.port,
        download: usage(store, &Root::Download),
        pending: pending_usage(store, state.server.pending_dir.clone()),
        active_sessions: state.sessions.count(),
    }))
}

/// GET /logs?level=&limit= - Audit entries, newest first.
pub async fn view_logs(
    State(state): State<SharedState>,
    RequireAdmin(_session): RequireAdmin,
    Query(query): Query<LogsQuery>,
) -> Result<Json<ApiResponse<LogsResponse>>, ApiError> {
    let level = match query.level.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            raw.parse::<AuditLevel>()
                .map_err(|_| ApiError::bad_request(format!("Unknown log level: {}", raw)))?,
        ),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);

    let entries = state.audit.recent(limit, level)?;
    Ok(Json(ApiResponse::new(LogsResponse {
        level: level.map(|l| l.as_str().to_string()),
        entries,
    })))
}
