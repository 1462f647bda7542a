//! Error types crossing the HTTP boundary

mod types;

pub use types::{ApiError, ErrorDetail, ErrorResponse};
