//! Error types for configuration loading.

use thiserror::Error;

/// Errors raised while reading or interpreting a configuration.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown {kind} type: {name}")]
    UnknownType { kind: &'static str, name: String },

    #[error("Missing required key {key} in {context}")]
    MissingKey { key: String, context: String },

    #[error("Invalid configuration: {what}")]
    Invalid { what: String },

    #[error(
        "External solver coupling blocks require the embedding interface; \
         the standalone solver cannot run them"
    )]
    ExternalCoupling,

    #[error(transparent)]
    Model(#[from] hf_model::ModelError),
}

pub type ProjectResult<T> = Result<T, ProjectError>;
