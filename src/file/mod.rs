//! File management module for stagebox.
//!
//! This module provides:
//! - Lexical path sanitizing for every user-supplied path
//! - The object store over the download and pending roots
//! - The pending upload review workflow
//! - Batch operations and upload placement

pub mod batch;
mod path;
pub mod review;
mod store;
pub mod upload;

pub use batch::{batch_copy, batch_delete, batch_move, BatchReport};
pub use path::{sanitize_filename, RelPath};
pub use review::{PendingItem, ReviewService};
pub use store::{unique_name, Entry, LocalObjectStore, ObjectStore, Root};
pub use upload::{admit_upload, plan_upload, UploadPlan};
