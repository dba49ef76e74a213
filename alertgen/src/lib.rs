//! Transient-alert generation over a trixel-partitioned sky.
//!
//! A survey's pointing list is partitioned into mesh cells, each cell's
//! catalog rows are streamed in chunks through the variability engine,
//! and objects whose brightness moves past a detectability cutoff while
//! landing on a detector become alert rows in a per-cell SQLite store.
//! The stages:
//!
//! * [`partition`] maps observations onto the cells their fields touch,
//! * [`catalog`] streams a cell's sources in bounded chunks,
//! * [`pipeline`] gates each chunk photometrically and geometrically
//!   and persists the survivors,
//! * [`coordinator`] deals cells out to worker threads.
//!
//! Detector geometry enters only through the [`DetectorProjector`]
//! trait; [`MosaicCamera`] is the stock raft-grid implementation.

pub mod camera;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod obs;
pub mod partition;
pub mod pipeline;
pub mod progress;
pub mod store;

pub use camera::{DetectorHit, DetectorId, DetectorProjector, MosaicCamera};
pub use catalog::{CatalogSource, MemoryCatalog, Source, SqliteCatalog};
pub use config::{GateOrder, PipelineConfig};
pub use coordinator::{assign_cells, run_cells, RunConfig, RunSummary};
pub use error::PipelineError;
pub use obs::{load_pointings, Observation};
pub use partition::{partition_observations, CellObservations, SkyPartition, DEFAULT_MESH_LEVEL};
pub use pipeline::{AlertPipeline, CellStats};
pub use progress::ProgressLog;
pub use store::{AlertRecord, AlertStore, BaselineRecord, OutputBatch};
