//! HTTP error handling.
//!
//! Read endpoints and guard failures answer with a JSON [`ApiError`].
//! Form submissions answer with a [`Flash`] redirect back to the page they
//! came from, carrying `msg` and `type` query parameters.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::StageboxError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400), including rejected paths.
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Conflict (409).
    Conflict,
    /// Upload over quota (413).
    PayloadTooLarge,
    /// Unprocessable entity (422).
    UnprocessableEntity,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Create an unprocessable entity error.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnprocessableEntity, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StageboxError> for ApiError {
    fn from(err: StageboxError) -> Self {
        match &err {
            StageboxError::InvalidPath(_) => ApiError::bad_request(err.to_string()),
            StageboxError::Unauthorized(msg) | StageboxError::Auth(msg) => {
                ApiError::unauthorized(msg.clone())
            }
            StageboxError::Forbidden(msg) => ApiError::forbidden(msg.clone()),
            StageboxError::NotFound(_) => ApiError::not_found(err.to_string()),
            StageboxError::AlreadyExists(_) => ApiError::conflict(err.to_string()),
            StageboxError::QuotaExceeded { .. } => {
                ApiError::new(ErrorCode::PayloadTooLarge, err.to_string())
            }
            StageboxError::Validation(msg) => ApiError::unprocessable(msg.clone()),
            StageboxError::Io(_) | StageboxError::ConfigPersist(_) | StageboxError::Config(_) => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

/// Outcome flag of a [`Flash`] redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    /// The action completed.
    Success,
    /// The action failed.
    Error,
}

impl FlashKind {
    /// Value of the `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }
}

/// `302 Found` redirect carrying a status message.
///
/// ```
/// use stagebox::web::Flash;
///
/// let flash = Flash::success("/review", "approved a.txt").with_param("path", "docs");
/// assert_eq!(flash.location(), "/review?path=docs&msg=approved%20a.txt&type=success");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    page: String,
    params: Vec<(String, String)>,
    message: String,
    kind: FlashKind,
}

impl Flash {
    /// Redirect to `page` reporting success.
    pub fn success(page: &str, message: impl Into<String>) -> Self {
        Self::new(page, message, FlashKind::Success)
    }

    /// Redirect to `page` reporting failure.
    pub fn error(page: &str, message: impl Into<String>) -> Self {
        Self::new(page, message, FlashKind::Error)
    }

    /// Redirect to `page` reporting `err`, prefixed by `context`.
    ///
    /// Internal errors are logged and shown as a generic message.
    pub fn failure(page: &str, context: &str, err: &StageboxError) -> Self {
        let detail = match err {
            StageboxError::Io(_) | StageboxError::ConfigPersist(_) | StageboxError::Config(_) => {
                tracing::error!("{}: {}", context, err);
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        Self::error(page, format!("{}: {}", context, detail))
    }

    fn new(page: &str, message: impl Into<String>, kind: FlashKind) -> Self {
        Self {
            page: page.to_string(),
            params: Vec::new(),
            message: message.into(),
            kind,
        }
    }

    /// Keep an extra query parameter, such as the directory being viewed.
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    /// Outcome flag.
    pub fn kind(&self) -> FlashKind {
        self.kind
    }

    /// Target URL including the query string.
    pub fn location(&self) -> String {
        let mut query: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        query.push(format!("msg={}", urlencoding::encode(&self.message)));
        query.push(format!("type={}", self.kind.as_str()));
        format!("{}?{}", self.page, query.join("&"))
    }
}

impl IntoResponse for Flash {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(header::LOCATION, self.location())]).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_stagebox_error() {
        let cases = [
            (StageboxError::InvalidPath("..".into()), ErrorCode::BadRequest),
            (StageboxError::Unauthorized("x".into()), ErrorCode::Unauthorized),
            (StageboxError::Auth("x".into()), ErrorCode::Unauthorized),
            (StageboxError::Forbidden("x".into()), ErrorCode::Forbidden),
            (StageboxError::NotFound("x".into()), ErrorCode::NotFound),
            (StageboxError::AlreadyExists("x".into()), ErrorCode::Conflict),
            (
                StageboxError::QuotaExceeded { size: 2, limit: 1 },
                ErrorCode::PayloadTooLarge,
            ),
            (StageboxError::Validation("x".into()), ErrorCode::UnprocessableEntity),
            (StageboxError::ConfigPersist("x".into()), ErrorCode::InternalError),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code(), code);
        }
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "/secret/path");
        let err = ApiError::from(StageboxError::Io(io));
        assert!(!err.message().contains("/secret/path"));
    }

    #[test]
    fn test_flash_location() {
        let flash = Flash::error("/files", "2 succeeded, 1 failed");
        assert_eq!(
            flash.location(),
            "/files?msg=2%20succeeded%2C%201%20failed&type=error"
        );
    }

    #[test]
    fn test_flash_params_are_encoded() {
        let flash = Flash::success("/review", "ok").with_param("path", "docs/a b&c");
        assert_eq!(
            flash.location(),
            "/review?path=docs%2Fa%20b%26c&msg=ok&type=success"
        );
    }

    #[test]
    fn test_flash_failure_hides_io_detail() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "/srv/secret");
        let flash = Flash::failure("/files", "Delete failed", &StageboxError::Io(io));
        assert_eq!(flash.kind(), FlashKind::Error);
        assert!(!flash.location().contains("secret"));

        let flash = Flash::failure(
            "/files",
            "Delete failed",
            &StageboxError::NotFound("docs/a.txt".into()),
        );
        assert!(flash.location().contains("docs%2Fa.txt%20not%20found"));
    }

    #[test]
    fn test_flash_response() {
        let response = Flash::success("/files", "done").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/files?msg=done&type=success"
        );
    }
}
