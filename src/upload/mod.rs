//! # Upload Pipeline
//!
//! Orchestrates one upload attempt: resize the current capture, check the
//! session, send it as multipart with progress under an overall timeout,
//! and reduce whatever happens to one user-visible result string.
//!
//! Only one attempt runs at a time. A second [`UploadPipeline::upload`]
//! while an attempt is in flight is rejected with a state error instead
//! of racing the first.

pub mod pipeline;
pub mod state;

pub use pipeline::{UploadFailure, UploadOutcome, UploadPipeline, UploadSettings, classify, summarize};
pub use state::{UploadPhase, UploadSnapshot};

/// Progress shown as soon as sending starts.
pub const INITIAL_PROGRESS: u8 = 5;
