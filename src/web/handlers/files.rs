//! File browsing, download, upload and management handlers.

use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, Query, Request, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Form, Json,
};
use tokio::io::AsyncWriteExt;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::audit::AuditLevel;
use crate::auth::Session;
use crate::file::{
    admit_upload, batch_copy, batch_delete, batch_move, plan_upload, BatchReport, ObjectStore,
    RelPath, Root, UploadPlan,
};
use crate::web::dto::{
    ApiResponse, BatchForm, DirectoryChoicesResponse, EntryResponse, ListingResponse, MkdirForm,
    PathQuery, SessionView, UploadViewResponse,
};
use crate::web::error::{ApiError, Flash};
use crate::web::handlers::{AppState, SharedState};
use crate::web::middleware::{CurrentSession, RequireAdmin, RequireSession};
use crate::StageboxError;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped, quotes and backslashes replaced, and
/// non-ASCII names get an RFC 5987 `filename*` parameter.
pub(crate) fn content_disposition_header(filename: &str) -> String {
    let plain = filename.is_ascii()
        && !filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');
    if plain {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() => c,
            _ => '_',
        })
        .collect();
    let cleaned: String = filename.chars().filter(|c| !c.is_control()).collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(&cleaned)
    )
}

/// GET /files - List a directory of the download root.
pub async fn list_files(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    let path = RelPath::parse(&query.path)?;
    let meta = state.store.metadata(&Root::Download, &path)?;
    if !meta.is_dir {
        return Err(ApiError::bad_request(format!("{} is not a directory", path)));
    }

    let entries = state
        .store
        .list(&Root::Download, &path)?
        .into_iter()
        .map(EntryResponse::from)
        .collect();

    Ok(Json(ApiResponse::new(ListingResponse {
        path: path.as_string(),
        parent: path.parent().map(|p| p.as_string()),
        entries,
        can_manage: session.as_ref().is_some_and(Session::is_admin),
        session: session.as_ref().map(SessionView::from),
    })))
}

/// GET /download?path= - Stream a published file.
pub async fn download(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<PathQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    let path = RelPath::parse(&query.path)?;
    if path.is_root() {
        return Err(ApiError::bad_request("No file specified"));
    }

    let meta = state.store.metadata(&Root::Download, &path)?;
    if meta.is_dir {
        return Err(ApiError::bad_request("Cannot download a directory"));
    }

    let full = state.store.resolve(&Root::Download, &path);
    let mime = mime_guess::from_path(&meta.name).first_or_octet_stream();
    let response = match ServeFile::new_with_mime(&full, &mime).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    let disposition = HeaderValue::from_str(&content_disposition_header(&meta.name)).map_err(|e| {
        tracing::error!("Failed to build Content-Disposition header: {}", e);
        ApiError::internal("Failed to build response")
    })?;
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);

    state.audit(
        AuditLevel::Info,
        session.as_ref(),
        "download",
        format!("{} ({} bytes)", path, meta.size),
    );
    Ok(response)
}

/// GET /upload - Target directories and the caller's quota.
pub async fn upload_page(
    State(state): State<SharedState>,
    RequireSession(session): RequireSession,
) -> Result<Json<ApiResponse<UploadViewResponse>>, ApiError> {
    let directories = DirectoryChoicesResponse::new(state.review.directory_choices()?).directories;

    Ok(Json(ApiResponse::new(UploadViewResponse {
        directories,
        max_upload_bytes: session.max_upload_bytes,
        requires_review: !session.is_admin(),
    })))
}

/// POST /upload - multipart with `directory`, optional `relativePath` and
/// `size`, then one or more `file` fields.
///
/// Text fields apply to the file fields after them. Bodies are streamed to
/// disk and cut off as soon as they pass the caller's quota.
pub async fn upload(
    State(state): State<SharedState>,
    RequireSession(session): RequireSession,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut directory = String::new();
    let mut relative_path: Option<String> = None;
    let mut stored: Vec<UploadPlan> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "directory" => directory = field_text(field).await?,
            "relativePath" => relative_path = Some(field_text(field).await?),
            "size" => {
                let raw = field_text(field).await?;
                let Ok(size) = raw.trim().parse::<u64>() else {
                    return Ok(Flash::error("/upload", "Invalid file size").into_response());
                };
                if let Err(e) = admit_upload(&session, size) {
                    state.audit(AuditLevel::Warning, Some(&session), "upload", e.to_string());
                    return Ok(Flash::failure("/upload", "Upload rejected", &e).into_response());
                }
            }
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                if filename.is_empty() {
                    return Ok(Flash::error("/upload", "No file provided").into_response());
                }
                let plan = match plan_upload(
                    &session,
                    &directory,
                    relative_path.as_deref(),
                    &filename,
                ) {
                    Ok(plan) => plan,
                    Err(e) => {
                        state.audit(AuditLevel::Warning, Some(&session), "upload", e.to_string());
                        return Ok(Flash::failure("/upload", "Upload rejected", &e).into_response());
                    }
                };

                match store_upload(&state, &session, &plan, field).await {
                    Ok(size) => {
                        let place = if plan.is_pending() { "pending" } else { "published" };
                        state.audit(
                            AuditLevel::Success,
                            Some(&session),
                            "upload",
                            format!("{} {} ({} bytes)", place, plan.path(), size),
                        );
                        stored.push(plan);
                    }
                    Err(e) => {
                        state.audit(AuditLevel::Error, Some(&session), "upload", e.to_string());
                        return Ok(Flash::failure("/upload", "Upload failed", &e).into_response());
                    }
                }
                relative_path = None;
            }
            _ => {}
        }
    }

    let Some(last) = stored.last() else {
        return Ok(Flash::error("/upload", "No file provided").into_response());
    };

    let message = if last.is_pending() {
        format!("Uploaded {} file(s), awaiting review", stored.len())
    } else {
        format!("Uploaded {} file(s)", stored.len())
    };
    let back = RelPath::parse(&directory).unwrap_or_else(|_| RelPath::root());
    Ok(Flash::success("/files", message)
        .with_param("path", back.as_string())
        .into_response())
}

async fn field_text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(|e| {
        tracing::error!("Failed to read multipart text field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })
}

/// Stream one file field to its planned location, returning bytes written.
///
/// The body goes to a staging file that replaces the target only once the
/// stream completed, so a failed upload leaves any existing file in place.
async fn store_upload(
    state: &AppState,
    session: &Session,
    plan: &UploadPlan,
    mut field: Field<'_>,
) -> crate::Result<u64> {
    let staging = plan.staging_path();
    let file = state.store.create_file(&plan.root, &staging)?;
    let mut file = tokio::fs::File::from_std(file);

    let mut written: u64 = 0;
    let outcome: crate::Result<()> = async {
        loop {
            let chunk = field.chunk().await.map_err(|e| {
                StageboxError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    e.to_string(),
                ))
            })?;
            let Some(chunk) = chunk else {
                break;
            };
            written += chunk.len() as u64;
            admit_upload(session, written)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
    .await;
    drop(file);

    let outcome =
        outcome.and_then(|()| state.store.rename(&plan.root, &staging, &plan.root, &plan.path()));
    if let Err(e) = outcome {
        if let Err(cleanup) = state.store.delete(&plan.root, &staging) {
            tracing::warn!("Failed to remove partial upload {}: {}", staging, cleanup);
        }
        return Err(e);
    }
    Ok(written)
}

/// GET /mkdir - Directory choices for the parent.
pub async fn mkdir_page(
    State(state): State<SharedState>,
    RequireAdmin(_session): RequireAdmin,
) -> Result<Json<ApiResponse<DirectoryChoicesResponse>>, ApiError> {
    let dirs = state.review.directory_choices()?;
    Ok(Json(ApiResponse::new(DirectoryChoicesResponse::new(dirs))))
}

/// POST /mkdir - Create `parent_dir/dir_name` in the download root.
pub async fn mkdir(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    Form(form): Form<MkdirForm>,
) -> Flash {
    let back = |msg: &str| Flash::error("/mkdir", msg).with_param("path", form.parent_dir.clone());

    if form.dir_name.trim().is_empty() {
        return back("Directory name is required");
    }

    let target = RelPath::parse(&form.parent_dir)
        .and_then(|parent| RelPath::segment(form.dir_name.trim()).map(|name| parent.join(&name)));
    let target = match target {
        Ok(target) => target,
        Err(e) => {
            return Flash::failure("/mkdir", "Invalid directory", &e)
                .with_param("path", form.parent_dir.clone())
        }
    };

    match state.store.create_dir(&Root::Download, &target) {
        Ok(()) => {
            state.audit(AuditLevel::Success, Some(&session), "mkdir", target.as_string());
            Flash::success("/files", format!("Created directory {}", target))
                .with_param("path", target.as_string())
        }
        Err(StageboxError::AlreadyExists(_)) => back("Directory already exists"),
        Err(e) => {
            state.audit(AuditLevel::Error, Some(&session), "mkdir", e.to_string());
            Flash::failure("/mkdir", "Failed to create directory", &e)
                .with_param("path", form.parent_dir.clone())
        }
    }
}

/// GET /delete?path= - Delete a published path and any pending copies.
pub async fn delete(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    Query(query): Query<PathQuery>,
) -> Flash {
    let path = match RelPath::parse(&query.path) {
        Ok(path) => path,
        Err(e) => return Flash::failure("/files", "Delete failed", &e),
    };
    let parent = path.parent().unwrap_or_else(RelPath::root).as_string();

    match state.review.delete_published(&path) {
        Ok(cleaned) => {
            let details = if cleaned.is_empty() {
                path.as_string()
            } else {
                format!("{} (pending copies of {})", path, cleaned.join(", "))
            };
            state.audit(AuditLevel::Success, Some(&session), "delete", details);
            Flash::success("/files", format!("Deleted {}", path)).with_param("path", parent)
        }
        Err(e) => {
            state.audit(AuditLevel::Error, Some(&session), "delete", e.to_string());
            Flash::failure("/files", "Delete failed", &e).with_param("path", parent)
        }
    }
}

fn report_level(report: &BatchReport) -> AuditLevel {
    if report.all_succeeded() {
        AuditLevel::Success
    } else {
        AuditLevel::Warning
    }
}

fn batch_flash(action: &str, report: &BatchReport) -> Flash {
    let message = format!("{}: {}", action, report);
    if report.all_succeeded() {
        Flash::success("/files", message)
    } else {
        Flash::error("/files", message)
    }
}

/// POST /batch-delete
pub async fn batch_delete_files(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    axum_extra::extract::Form(form): axum_extra::extract::Form<BatchForm>,
) -> Flash {
    if form.files.is_empty() {
        return Flash::error("/files", "No files selected");
    }

    let report = batch_delete(&state.review, &form.files);
    state.audit(
        report_level(&report),
        Some(&session),
        "batch-delete",
        format!("{} [{}]", report, form.files.join(", ")),
    );
    batch_flash("Delete", &report)
}

/// POST /batch-move
pub async fn batch_move_files(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    axum_extra::extract::Form(form): axum_extra::extract::Form<BatchForm>,
) -> Flash {
    transfer(&state, &session, form, Transfer::MOVE)
}

/// POST /batch-copy
pub async fn batch_copy_files(
    State(state): State<SharedState>,
    RequireAdmin(session): RequireAdmin,
    axum_extra::extract::Form(form): axum_extra::extract::Form<BatchForm>,
) -> Flash {
    transfer(&state, &session, form, Transfer::COPY)
}

type TransferFn = fn(&dyn ObjectStore, &[String], &str) -> crate::Result<BatchReport>;

struct Transfer {
    action: &'static str,
    verb: &'static str,
    run: TransferFn,
}

impl Transfer {
    const MOVE: Transfer = Transfer {
        action: "batch-move",
        verb: "Move",
        run: batch_move,
    };
    const COPY: Transfer = Transfer {
        action: "batch-copy",
        verb: "Copy",
        run: batch_copy,
    };
}

fn transfer(state: &AppState, session: &Session, form: BatchForm, op: Transfer) -> Flash {
    if form.files.is_empty() {
        return Flash::error("/files", "No files selected");
    }
    let target = form.target_path.trim();
    if target.is_empty() {
        return Flash::error("/files", "Target path is required");
    }

    match (op.run)(state.store.as_ref(), &form.files, target) {
        Ok(report) => {
            state.audit(
                report_level(&report),
                Some(session),
                op.action,
                format!("{} to {} [{}]", report, target, form.files.join(", ")),
            );
            batch_flash(op.verb, &report).with_param("path", target)
        }
        Err(e) => {
            state.audit(AuditLevel::Error, Some(session), op.action, e.to_string());
            Flash::failure("/files", "Invalid target path", &e)
        }
    }
}
