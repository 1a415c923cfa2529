//! HTTP interface.
//!
//! Read endpoints answer with JSON; form posts answer with a redirect
//! carrying `msg` and `type` query parameters. The session travels in the
//! `session_id` cookie.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::{ApiError, Flash, FlashKind};
pub use handlers::{AppState, SharedState};
pub use router::{create_health_router, create_router};
pub use server::WebServer;
