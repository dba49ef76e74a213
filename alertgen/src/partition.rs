//! Partitioning observations onto the sky mesh.
//!
//! Each mesh cell collects the observations whose field of view touches
//! it, so a cell plus its observation list is a self-contained unit of
//! work. Candidate selection is a cheap separation test; membership is
//! settled by the exact trixel-versus-cap classification, so no touching
//! observation is ever missed.

use skymesh::{leaf_trixels, Containment, Equatorial, HalfSpace, Trixel, TrixelId};

use crate::obs::Observation;

/// Default mesh level for work cells; level 6 has 8192 of them.
pub const DEFAULT_MESH_LEVEL: u32 = 6;

/// Margin added to a cell's radius in the candidate test, degrees. The
/// exact classification still decides membership; the margin only has to
/// keep every touching observation in the candidate set.
pub const CANDIDATE_MARGIN_DEG: f64 = 1.75;

/// One cell's worth of work: the trixel and the observations touching
/// it, sorted by exposure time.
#[derive(Debug, Clone)]
pub struct CellObservations {
    pub cell: Trixel,
    pub observations: Vec<Observation>,
}

impl CellObservations {
    pub fn id(&self) -> TrixelId {
        self.cell.id()
    }
}

/// The partitioned sky: non-empty cells ordered heaviest first.
#[derive(Debug)]
pub struct SkyPartition {
    cells: Vec<CellObservations>,
    level: u32,
}

impl SkyPartition {
    pub fn cells(&self) -> &[CellObservations] {
        &self.cells
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total observation count across cells; an observation spanning
    /// several cells counts once per cell.
    pub fn total_load(&self) -> usize {
        self.cells.iter().map(|c| c.observations.len()).sum()
    }
}

/// Assign every observation to the mesh cells its field of view touches.
///
/// Deterministic: cells come out sorted by descending observation count
/// with ties broken by id, and each cell's observations are sorted by
/// MJD. Cells nothing touches are dropped.
pub fn partition_observations(observations: &[Observation], level: u32) -> SkyPartition {
    let margin = CANDIDATE_MARGIN_DEG.to_radians();
    let fields: Vec<HalfSpace> = observations
        .iter()
        .map(|o| HalfSpace::from_pointing(&o.pointing, o.fov_radius))
        .collect();

    let mut cells = Vec::new();
    for trixel in leaf_trixels(level) {
        let center = Equatorial::from_cartesian(&trixel.center());
        let reach = trixel.radius() + margin;
        let mut kept = Vec::new();
        for (obs, field) in observations.iter().zip(&fields) {
            // The margin floor covers the survey field of view; wider
            // custom fields extend the candidate reach to match.
            if center.separation(&obs.pointing) > reach.max(trixel.radius() + obs.fov_radius) {
                continue;
            }
            if field.classify(&trixel) != Containment::Outside {
                kept.push(obs.clone());
            }
        }
        if !kept.is_empty() {
            kept.sort_by(|a, b| a.mjd.total_cmp(&b.mjd));
            cells.push(CellObservations {
                cell: trixel,
                observations: kept,
            });
        }
    }

    cells.sort_by(|a, b| {
        b.observations
            .len()
            .cmp(&a.observations.len())
            .then(a.cell.id().cmp(&b.cell.id()))
    });
    SkyPartition { cells, level }
}
