//! Per-cell pipeline knobs.

/// Order of the two survival gates within a chunk.
///
/// The surviving sets are identical either way; photometric-first skips
/// detector projection for objects that could never pass photometrically
/// and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOrder {
    PhotometricFirst,
    GeometricFirst,
}

/// Tunables for one cell's filter-and-persist loop.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Catalog rows pulled per chunk.
    pub chunk_size: usize,
    /// Alert rows buffered before a store flush.
    pub write_every: usize,
    /// Minimum detectable magnitude change.
    pub dmag_cutoff: f64,
    pub gate_order: GateOrder,
    /// Stop after this many chunks per cell; a debug aid only.
    pub chunk_limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            chunk_size: 1000,
            write_every: 10_000,
            dmag_cutoff: 0.005,
            gate_order: GateOrder::PhotometricFirst,
            chunk_limit: None,
        }
    }
}
