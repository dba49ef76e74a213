//! The per-cell filter-and-persist loop.
//!
//! One cell is processed as a stream of bounded catalog chunks. Each
//! chunk is evaluated by the variability engine once for every epoch in
//! the cell, gated photometrically and geometrically, and the surviving
//! (object, observation) pairs become alert rows. Baseline rows follow
//! the first alert of each object. The two gates commute: the
//! photometric-first order only skips detector projection for objects
//! that could never show a detectable change.

use std::collections::HashSet;
use std::time::Instant;

use log::{debug, info, warn};
use ndarray::Array2;
use photom::{flux_from_mag, snr_at_depth, Band, PerBand, NOMINAL_M5, SNR_GAMMA};
use rayon::prelude::*;
use skymesh::{ancestor_id, level_of, Equatorial, TrixelId};
use variability::{apply_variability, EngineConfig, ObjectContext, VarDescriptor, VariabilityCache};

use crate::camera::{DetectorHit, DetectorProjector};
use crate::catalog::{CatalogSource, Source, MAS_PER_RAD};
use crate::config::{GateOrder, PipelineConfig};
use crate::error::PipelineError;
use crate::obs::Observation;
use crate::partition::CellObservations;
use crate::progress::ProgressLog;
use crate::store::{AlertRecord, AlertStore, BaselineRecord, OutputBatch};

/// Per-cell outcome counters.
#[derive(Debug, Clone)]
pub struct CellStats {
    pub cell_id: TrixelId,
    pub chunks: u64,
    pub rows_scanned: u64,
    pub alerts: u64,
    /// Objects that produced at least one alert in the cell.
    pub sources_alerted: u64,
    pub elapsed_s: f64,
}

/// True when `htmid` sits under `cell` in the mesh. Rows that fail this
/// are range-query leakage from neighboring cells.
fn in_cell(htmid: TrixelId, cell: TrixelId, level: u32) -> bool {
    match level_of(htmid) {
        Some(own) if own >= level => ancestor_id(htmid, level) == cell,
        _ => false,
    }
}

/// The filter-and-persist engine for one worker.
///
/// Holds only configuration and collaborators; all per-cell state lives
/// in the arguments to [`AlertPipeline::process_cell`], so one pipeline
/// serves every cell a worker owns.
pub struct AlertPipeline<'a> {
    pub config: PipelineConfig,
    pub engine: &'a EngineConfig,
    pub projector: &'a dyn DetectorProjector,
}

impl AlertPipeline<'_> {
    /// Run one cell to completion: stream, gate, persist, index.
    pub fn process_cell(
        &self,
        cell: &CellObservations,
        catalog: &mut dyn CatalogSource,
        cache: &mut VariabilityCache,
        store: &mut AlertStore,
        progress: &ProgressLog,
    ) -> Result<CellStats, PipelineError> {
        let cell_id = cell.id();
        let level = cell.cell.level();
        let observations = &cell.observations;
        let epochs: Vec<f64> = observations.iter().map(|o| o.mjd).collect();
        let started = Instant::now();

        let mut stats = CellStats {
            cell_id,
            chunks: 0,
            rows_scanned: 0,
            alerts: 0,
            sources_alerted: 0,
            elapsed_s: 0.0,
        };
        let mut seen: HashSet<i64> = HashSet::new();
        let mut batch = OutputBatch::default();

        catalog.begin_cell(cell_id)?;
        loop {
            if self
                .config
                .chunk_limit
                .is_some_and(|limit| stats.chunks as usize >= limit)
            {
                break;
            }
            let mut rows = catalog.next_chunk(self.config.chunk_size)?;
            if rows.is_empty() {
                break;
            }
            stats.chunks += 1;
            stats.rows_scanned += rows.len() as u64;

            rows.retain(|source| {
                if !in_cell(source.htmid, cell_id, level) {
                    return false;
                }
                if !seen.insert(source.unique_id) {
                    warn!(
                        "cell {cell_id}: duplicate catalog row for object {}",
                        source.unique_id
                    );
                    return false;
                }
                true
            });
            if rows.is_empty() {
                continue;
            }

            let (emitted, sources) =
                self.process_chunk(&rows, observations, &epochs, cache, store, &mut batch)?;
            stats.alerts += emitted;
            stats.sources_alerted += sources;

            let line = format!(
                "cell {cell_id} chunk {} rows {} alerts {} elapsed {:.1}s",
                stats.chunks,
                stats.rows_scanned,
                stats.alerts,
                started.elapsed().as_secs_f64()
            );
            debug!("{line}");
            progress.append(&line)?;
        }

        store.write_alerts(&mut batch)?;
        store.build_indices()?;
        stats.elapsed_s = started.elapsed().as_secs_f64();

        let line = format!(
            "cell {cell_id} done: {} rows {} alerts {} sources in {:.1}s",
            stats.rows_scanned, stats.alerts, stats.sources_alerted, stats.elapsed_s
        );
        info!("{line}");
        progress.append(&line)?;
        Ok(stats)
    }

    fn process_chunk(
        &self,
        rows: &[Source],
        observations: &[Observation],
        epochs: &[f64],
        cache: &mut VariabilityCache,
        store: &mut AlertStore,
        batch: &mut OutputBatch,
    ) -> Result<(u64, u64), PipelineError> {
        let n = rows.len();
        let ids: Vec<i64> = rows.iter().map(|s| s.unique_id).collect();
        let parallax: Vec<f64> = rows.iter().map(|s| s.parallax_rad).collect();
        let descriptors: Vec<Option<VarDescriptor>> =
            rows.iter().map(|s| s.descriptor.clone()).collect();
        let mut mags = Array2::zeros((Band::COUNT, n));
        for (i, source) in rows.iter().enumerate() {
            for band in Band::ALL {
                mags[[band.index(), i]] = source.quiescent_mags[band];
            }
        }
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descriptors,
            parallax_rad: &parallax,
            quiescent_mags: mags.view(),
        };
        let dmag = apply_variability(self.engine, cache, &ctx, epochs)?;

        let cutoff = self.config.dmag_cutoff;
        let candidates: Vec<usize> = match self.config.gate_order {
            // A change below the cutoff at every epoch can never pass
            // the full gate, so projection is skipped for those objects.
            GateOrder::PhotometricFirst => (0..n)
                .filter(|&i| {
                    Band::ALL.iter().any(|band| {
                        (0..epochs.len()).any(|j| dmag[[band.index(), i, j]].abs() >= cutoff)
                    })
                })
                .collect(),
            GateOrder::GeometricFirst => (0..n).collect(),
        };
        if candidates.is_empty() {
            return Ok((0, 0));
        }

        // Detector hits per observation per candidate. Projection is
        // the chunk's hot loop and fans out across the rayon pool.
        let hits: Vec<Vec<Option<(Equatorial, DetectorHit)>>> = observations
            .iter()
            .map(|obs| {
                candidates
                    .par_iter()
                    .map(|&i| {
                        let position = rows[i].position_at(obs.mjd);
                        self.projector
                            .locate(&obs.pointing, &position)
                            .map(|hit| (position, hit))
                    })
                    .collect()
            })
            .collect();

        // Full gate: some geometrically valid epoch must show a change
        // past the cutoff that stays above the band's detection limit.
        let survivors: Vec<bool> = candidates
            .iter()
            .enumerate()
            .map(|(ci, &i)| {
                (0..observations.len()).any(|j| {
                    hits[j][ci].is_some()
                        && Band::ALL.iter().any(|&band| {
                            let offset = dmag[[band.index(), i, j]];
                            offset.abs() >= cutoff
                                && rows[i].quiescent_mags[band] + offset <= NOMINAL_M5[band]
                        })
                })
            })
            .collect();

        let mut emitted = 0u64;
        let mut alerted = vec![false; candidates.len()];
        for (j, obs) in observations.iter().enumerate() {
            for (ci, &i) in candidates.iter().enumerate() {
                if !survivors[ci] {
                    continue;
                }
                let Some((position, hit)) = hits[j][ci] else {
                    continue;
                };
                let band = obs.band;
                let quiescent = rows[i].quiescent_mags[band];
                let magnitude = quiescent + dmag[[band.index(), i, j]];
                let flux = flux_from_mag(magnitude);
                batch.push(AlertRecord {
                    unique_id: rows[i].unique_id,
                    obs_id: obs.obs_id,
                    x_pix: hit.x_pix,
                    y_pix: hit.y_pix,
                    chip_num: hit.chip.number(),
                    dflux: flux - flux_from_mag(quiescent),
                    snr: snr_at_depth(magnitude, obs.m5[band], SNR_GAMMA),
                    ra_deg: position.ra_degrees(),
                    dec_deg: position.dec_degrees(),
                });
                alerted[ci] = true;
                emitted += 1;
            }
            if batch.len() >= self.config.write_every {
                store.write_alerts(batch)?;
            }
        }

        // Baselines ride with the chunk that first alerted the object;
        // the duplicate filter guarantees once per cell.
        let reference_mjd = epochs[0];
        let baselines: Vec<BaselineRecord> = candidates
            .iter()
            .enumerate()
            .filter(|(ci, _)| alerted[*ci])
            .map(|(_, &i)| {
                let source = &rows[i];
                let position = source.position_at(reference_mjd);
                BaselineRecord {
                    unique_id: source.unique_id,
                    quiescent_flux: source.quiescent_mags.map(|&m| flux_from_mag(m)),
                    quiescent_snr: PerBand::from_fn(|band| {
                        snr_at_depth(source.quiescent_mags[band], NOMINAL_M5[band], SNR_GAMMA)
                    }),
                    ra_deg: position.ra_degrees(),
                    dec_deg: position.dec_degrees(),
                    pm_ra_mas: source.pm_ra * MAS_PER_RAD,
                    pm_dec_mas: source.pm_dec * MAS_PER_RAD,
                    parallax_mas: source.parallax_rad * MAS_PER_RAD,
                    reference_mjd,
                }
            })
            .collect();
        store.write_baselines(&baselines)?;

        Ok((emitted, baselines.len() as u64))
    }
}
