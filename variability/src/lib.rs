//! Stateful source-variability models.
//!
//! Catalog rows declare their variability as a JSON descriptor naming a
//! model and its parameters. This crate parses those descriptors and
//! evaluates the models over a batch of epochs, producing per-band
//! magnitude offsets relative to each object's quiescent magnitudes.
//! Model families:
//!
//! * folded light curves (RR Lyrae, Cepheids, eclipsing binaries),
//! * damped-random-walk AGN variability,
//! * point-lens and tabulated black-hole microlensing,
//! * AM CVn oscillation and outbursts,
//! * M/L/T-dwarf flaring from flux templates.
//!
//! All models are deterministic functions of the descriptor, so repeated
//! evaluation of the same object and epochs reproduces identical offsets
//! regardless of batching. The per-worker [`VariabilityCache`] only
//! short-circuits recomputation.

pub mod cache;
pub mod descriptor;
pub mod engine;
mod error;
pub mod lightcurve;
mod models;
pub mod spline;

pub use cache::{VariabilityCache, WalkState};
pub use descriptor::{Model, VarDescriptor};
pub use engine::{apply_variability, EngineConfig, ObjectContext, SURVEY_START_MJD};
pub use error::VarError;
