//! Pending upload review handlers.

use axum::{
    extract::{Query, State},
    Form, Json,
};

use crate::audit::AuditLevel;
use crate::file::RelPath;
use crate::web::dto::{
    ApiResponse, ApproveForm, PathQuery, PendingItemResponse, RejectForm, ReviewResponse,
};
use crate::web::error::{ApiError, Flash};
use crate::web::handlers::SharedState;
use crate::web::middleware::RequireAdmin;

/// GET /review?path= - Pending uploads of every user, newest first.
///
/// With `path` only items staged under that directory are listed.
pub async fn review_page(
    State(state): State<SharedState>,
    RequireAdmin(_session): RequireAdmin,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    let scope = RelPath::parse(&query.path)?;
    let items = state
        .review
        .discover(&scope)?
        .into_iter()
        .map(PendingItemResponse::from)
        .collect();
    let directories = state
        .review
        .directory_choices()?
        .iter()
        .map(RelPath::as_string)
        .collect();

    Ok(Json(ApiResponse::new(ReviewResponse {
        path: scope.as_string(),
        items,
        directories,
    })))
}

/// POST /approve - Publish a pending file.
pub async fn approve(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    Form(form): Form<ApproveForm>,
) -> Flash {
    let target_dir = if form.target_dir.trim().is_empty() {
        // Default to where the uploader aimed it.
        form.current_path.clone()
    } else {
        form.target_dir.clone()
    };

    match state
        .review
        .approve(&form.file, &form.username, &form.current_path, &target_dir)
    {
        Ok(published) => {
            state.audit(
                AuditLevel::Success,
                Some(&session),
                "approve",
                format!("{} from {} -> {}", form.file, form.username, published),
            );
            Flash::success("/review", format!("Approved '{}'", form.file))
                .with_param("path", form.current_path)
        }
        Err(e) => {
            state.audit(
                AuditLevel::Error,
                Some(&session),
                "approve",
                format!("{} from {}: {}", form.file, form.username, e),
            );
            Flash::failure("/review", "Approval failed", &e).with_param("path", form.current_path)
        }
    }
}

/// POST /reject - Discard a pending file.
pub async fn reject(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    Form(form): Form<RejectForm>,
) -> Flash {
    match state
        .review
        .reject(&form.file, &form.username, &form.current_path)
    {
        Ok(removed) => {
            state.audit(
                AuditLevel::Success,
                Some(&session),
                "reject",
                format!("{} from {}", removed, form.username),
            );
            Flash::success("/review", format!("Rejected '{}'", form.file))
                .with_param("path", form.current_path)
        }
        Err(e) => {
            state.audit(
                AuditLevel::Error,
                Some(&session),
                "reject",
                format!("{} from {}: {}", form.file, form.username, e),
            );
            Flash::failure("/review", "Rejection failed", &e).with_param("path", form.current_path)
        }
    }
}

