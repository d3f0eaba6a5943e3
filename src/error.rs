use thiserror::Error;

use crate::import::{ImportSource, ImportStatus};

/// File-level failures of the import pipeline. Row-level defects never end up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unrecognized format (headers: {})", .headers.join(", "))]
    UnrecognizedFormat { headers: Vec<String> },

    #[error("file is empty")]
    EmptyFile,

    #[error("no days could be read from the {format} file")]
    NoDays { format: ImportSource },

    #[error("invalid csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid backup payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot move import session from {from} to {to}")]
    InvalidTransition { from: ImportStatus, to: ImportStatus },

    #[error("no import session in progress")]
    NoSession,

    #[error("{format} does not export individual foods")]
    UnsupportedImportType { format: ImportSource },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
