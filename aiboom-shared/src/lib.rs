//! Shared building blocks for the AI-BOOM services: errors, API envelopes,
//! auth extractors, tracing and metrics bootstrap, infrastructure clients.

pub mod types;
pub mod errors;
pub mod middleware;
pub mod clients;

pub use types::*;
pub use errors::{AppError, ErrorCode, AppResult};
