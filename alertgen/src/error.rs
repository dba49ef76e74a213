use std::io;
use std::path::PathBuf;

use thiserror::Error;
use variability::VarError;

/// Errors raised while partitioning, filtering, or persisting alerts.
///
/// Configuration problems (a store or log that already exists, an output
/// path that is not a directory) are caught before any cell work starts;
/// everything else wraps a collaborator failure and aborts the worker's
/// current cell.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("alert store {} already exists", path.display())]
    StoreExists { path: PathBuf },

    #[error("progress log {} already exists", path.display())]
    LogExists { path: PathBuf },

    #[error("{} exists and is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("pointing list {}: {reason}", path.display())]
    PointingList { path: PathBuf, reason: String },

    #[error("variability evaluation failed")]
    Variability(#[from] VarError),

    #[error("alert store query failed")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed JSON input")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
