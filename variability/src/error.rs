use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing descriptors or evaluating models.
///
/// Everything here is fatal to the requesting cell: descriptors are
/// self-describing and expected to resolve, and a corrupt light-curve
/// table must surface rather than be clamped away.
#[derive(Error, Debug)]
pub enum VarError {
    #[error("malformed variability descriptor {text:?}")]
    BadDescriptor {
        text: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown variability model {0:?}")]
    UnknownModel(String),

    #[error("object {object_id}: parameter {name:?} is missing")]
    MissingParam { name: String, object_id: i64 },

    #[error("object {object_id}: parameter {name:?} is not a {expected}")]
    BadParam {
        name: String,
        object_id: i64,
        expected: &'static str,
    },

    #[error("light-curve table {}: {reason}", path.display())]
    LightCurve { path: PathBuf, reason: String },

    #[error("negative flux ratio interpolated from {}", path.display())]
    NegativeFluxRatio { path: PathBuf },

    #[error("object {object_id}: epoch {epoch} precedes reference epoch {reference}")]
    EpochBeforeReference {
        epoch: f64,
        reference: f64,
        object_id: i64,
    },

    #[error("flare template {key:?} not found under {}", dir.display())]
    MissingTemplate { key: String, dir: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
