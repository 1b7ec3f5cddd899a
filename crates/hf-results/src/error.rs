//! Error types for result writing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("Unsupported output suffix for {path} (expected .csv or .json)")]
    UnsupportedSuffix { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ResultsResult<T> = Result<T, ResultsError>;
