//! Fans cells out across worker threads.
//!
//! Cells arrive heaviest-first from the partitioner and are dealt
//! round-robin, which keeps worker loads within one cell of each other.
//! Every worker owns its catalog connection, light-curve cache, and the
//! stores for its cells; the only shared sinks are the progress log and
//! the per-cell callback.

use std::path::PathBuf;
use std::thread;

use log::{error, info};
use variability::{EngineConfig, VariabilityCache};

use crate::camera::DetectorProjector;
use crate::catalog::CatalogSource;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::partition::SkyPartition;
use crate::pipeline::{AlertPipeline, CellStats};
use crate::progress::ProgressLog;
use crate::store::AlertStore;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory receiving one store file per cell.
    pub output_dir: PathBuf,
    /// Store filename prefix.
    pub prefix: String,
    pub workers: usize,
    /// Reference-file tree handed to the variability engine.
    pub data_dir: PathBuf,
    pub pipeline: PipelineConfig,
}

/// Whole-run totals across all workers.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub cells_done: u64,
    pub alerts: u64,
    pub rows_scanned: u64,
    /// Workers that stopped early; their remaining cells were skipped.
    pub failed_workers: usize,
}

#[derive(Default)]
struct WorkerTally {
    cells_done: u64,
    alerts: u64,
    rows_scanned: u64,
    failed: bool,
}

/// Deal `n_cells` cell indices round-robin over `workers` lists.
pub fn assign_cells(n_cells: usize, workers: usize) -> Vec<Vec<usize>> {
    let workers = workers.max(1);
    let mut assignments = vec![Vec::new(); workers];
    for index in 0..n_cells {
        assignments[index % workers].push(index);
    }
    assignments
}

/// Process every cell of `partition`, `config.workers` cells at a time.
///
/// `make_catalog` opens one catalog per worker; `on_cell` observes each
/// finished cell (progress bars, tallies). A worker that hits an error
/// abandons its remaining cells and is counted in
/// [`RunSummary::failed_workers`]; the other workers run on.
pub fn run_cells<C, M, F>(
    config: &RunConfig,
    partition: &SkyPartition,
    projector: &dyn DetectorProjector,
    make_catalog: M,
    progress: &ProgressLog,
    on_cell: F,
) -> RunSummary
where
    C: CatalogSource,
    M: Fn(usize) -> Result<C, PipelineError> + Sync,
    F: Fn(&CellStats) + Sync,
{
    let assignments = assign_cells(partition.len(), config.workers);
    info!(
        "dispatching {} cells across {} workers",
        partition.len(),
        assignments.len()
    );

    let mut summary = RunSummary::default();
    thread::scope(|scope| {
        let mut handles = Vec::new();
        for (worker, cells) in assignments.into_iter().enumerate() {
            if cells.is_empty() {
                continue;
            }
            let make_catalog = &make_catalog;
            let on_cell = &on_cell;
            handles.push(scope.spawn(move || {
                let mut tally = WorkerTally::default();
                let engine = EngineConfig::new(&config.data_dir);
                let mut cache = VariabilityCache::new(engine.walk_cache_capacity);
                let pipeline = AlertPipeline {
                    config: config.pipeline.clone(),
                    engine: &engine,
                    projector,
                };
                let mut catalog = match make_catalog(worker) {
                    Ok(catalog) => catalog,
                    Err(err) => {
                        error!("worker {worker}: catalog open failed: {err}");
                        let _ = progress.append(&format!("worker {worker} failed: {err}"));
                        tally.failed = true;
                        return tally;
                    }
                };
                for &index in &cells {
                    let cell = &partition.cells()[index];
                    let outcome = AlertStore::open(
                        &config.output_dir,
                        &config.prefix,
                        cell.id(),
                        &cell.observations,
                    )
                    .and_then(|mut store| {
                        pipeline.process_cell(cell, &mut catalog, &mut cache, &mut store, progress)
                    });
                    match outcome {
                        Ok(stats) => {
                            tally.cells_done += 1;
                            tally.alerts += stats.alerts;
                            tally.rows_scanned += stats.rows_scanned;
                            on_cell(&stats);
                        }
                        Err(err) => {
                            error!("worker {worker}: cell {} failed: {err}", cell.id());
                            let _ = progress
                                .append(&format!("worker {worker} cell {} failed: {err}", cell.id()));
                            tally.failed = true;
                            break;
                        }
                    }
                }
                tally
            }));
        }

        for handle in handles {
            match handle.join() {
                Ok(tally) => {
                    summary.cells_done += tally.cells_done;
                    summary.alerts += tally.alerts;
                    summary.rows_scanned += tally.rows_scanned;
                    if tally.failed {
                        summary.failed_workers += 1;
                    }
                }
                Err(_) => {
                    error!("worker thread panicked");
                    summary.failed_workers += 1;
                }
            }
        }
    });
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};

    use photom::Band;
    use skymesh::Equatorial;

    use crate::camera::MosaicCamera;
    use crate::catalog::{MemoryCatalog, SqliteCatalog};
    use crate::obs::Observation;
    use crate::partition::partition_observations;

    #[test]
    fn assignment_is_round_robin_and_covers_every_cell() {
        let assignments = assign_cells(10, 3);
        assert_eq!(assignments[0], vec![0, 3, 6, 9]);
        assert_eq!(assignments[1], vec![1, 4, 7]);
        assert_eq!(assignments[2], vec![2, 5, 8]);

        let mut all: Vec<usize> = assignments.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn zero_workers_still_gets_one_list() {
        let assignments = assign_cells(4, 0);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0], vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_catalog_run_finishes_every_cell() {
        let out = tempfile::tempdir().unwrap();
        let pointing = Equatorial::from_degrees(40.0, -12.0);
        let observations = [Observation::new(
            7001,
            pointing,
            59580.0,
            Band::R,
            1.75_f64.to_radians(),
        )];
        let partition = partition_observations(&observations, 4);
        assert!(!partition.is_empty());

        let config = RunConfig {
            output_dir: out.path().to_path_buf(),
            prefix: "smoke".to_string(),
            workers: 2,
            data_dir: out.path().to_path_buf(),
            pipeline: PipelineConfig::default(),
        };
        let progress = ProgressLog::create(&out.path().join("run.log")).unwrap();
        let camera = MosaicCamera::default();
        let seen = AtomicU64::new(0);

        let summary = run_cells(
            &config,
            &partition,
            &camera,
            |_| Ok(MemoryCatalog::new(Vec::new())),
            &progress,
            |stats| {
                assert_eq!(stats.alerts, 0);
                seen.fetch_add(1, Ordering::Relaxed);
            },
        );

        assert_eq!(summary.cells_done, partition.len() as u64);
        assert_eq!(summary.failed_workers, 0);
        assert_eq!(summary.alerts, 0);
        assert_eq!(seen.load(Ordering::Relaxed), partition.len() as u64);
        for cell in partition.cells() {
            let path = out
                .path()
                .join(format!("smoke_{}_sqlite.db", cell.id()));
            assert!(path.exists());
        }
    }

    #[test]
    fn catalog_open_failure_marks_the_worker_failed() {
        let out = tempfile::tempdir().unwrap();
        let pointing = Equatorial::from_degrees(120.0, 30.0);
        let observations = [Observation::new(
            7002,
            pointing,
            59580.0,
            Band::G,
            1.75_f64.to_radians(),
        )];
        let partition = partition_observations(&observations, 4);

        let config = RunConfig {
            output_dir: out.path().to_path_buf(),
            prefix: "fail".to_string(),
            workers: 1,
            data_dir: out.path().to_path_buf(),
            pipeline: PipelineConfig::default(),
        };
        let progress = ProgressLog::create(&out.path().join("run.log")).unwrap();
        let camera = MosaicCamera::default();

        let summary = run_cells(
            &config,
            &partition,
            &camera,
            |_| SqliteCatalog::open(Path::new("/nonexistent/catalog.db"), "sources"),
            &progress,
            |_| {},
        );

        assert_eq!(summary.failed_workers, 1);
        assert_eq!(summary.cells_done, 0);
        let stores = std::fs::read_dir(out.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with("_sqlite.db"))
            .count();
        assert_eq!(stores, 0);
    }
}
