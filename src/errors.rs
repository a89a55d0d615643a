use thiserror::Error;

use crate::storage::api::ApiError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authorization failed: {0}")]
    Auth(#[source] ApiError),

    #[error("Upload of {object} rejected: {source}")]
    Upload {
        object: String,
        #[source]
        source: ApiError,
    },

    #[error("Part {part} failed after {attempts} attempts: {source}")]
    Transfer {
        part: u32,
        attempts: u32,
        #[source]
        source: ApiError,
    },

    #[error("{call} rejected: {source}")]
    Protocol {
        call: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Empty file not supported for multipart path: {0}")]
    EmptySource(String),

    #[error("Invalid part manifest: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },
}

impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    /// The remote failure behind this error, if it came from the storage service.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            AppError::Auth(source)
            | AppError::Upload { source, .. }
            | AppError::Transfer { source, .. }
            | AppError::Protocol { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
