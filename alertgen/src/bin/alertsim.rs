//! Generate transient alerts for a survey pointing list.
//!
//! Partitions the pointings onto the sky mesh, then streams each cell's
//! catalog sources through the variability engine and writes one SQLite
//! alert store per cell. Progress lines go to a run log that must not
//! already exist, so interrupted runs are never silently appended to.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use alertgen::{
    load_pointings, partition_observations, run_cells, MosaicCamera, PipelineConfig,
    PipelineError, ProgressLog, RunConfig, SqliteCatalog, DEFAULT_MESH_LEVEL,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate per-cell transient alert stores from a source catalog"
)]
struct Args {
    /// SQLite source catalog.
    #[arg(long)]
    catalog: PathBuf,

    /// Catalog table holding the sources.
    #[arg(long, default_value = "sources")]
    table: String,

    /// JSON pointing list for the survey window.
    #[arg(long)]
    pointings: PathBuf,

    /// Directory receiving the per-cell store files; created if absent.
    #[arg(long)]
    out_dir: PathBuf,

    /// Store filename prefix.
    #[arg(long, default_value = "alerts")]
    out_prefix: String,

    /// Run log path; refuses to overwrite an existing file.
    #[arg(long)]
    log_file: PathBuf,

    /// Variability reference-file tree (light curves, flare templates).
    #[arg(long)]
    data_dir: PathBuf,

    /// Worker threads, one cell in flight per worker.
    #[arg(long, default_value_t = 4)]
    n_proc: usize,

    /// Minimum absolute magnitude change that can alert.
    #[arg(long, default_value_t = 0.005)]
    dmag_cutoff: f64,

    /// Mesh subdivision level for the cell grid.
    #[arg(long, default_value_t = DEFAULT_MESH_LEVEL)]
    mesh_level: u32,

    /// Stop every cell after this many chunks; a debug aid.
    #[arg(long)]
    chunk_limit: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    if args.out_dir.exists() && !args.out_dir.is_dir() {
        return Err(PipelineError::NotADirectory {
            path: args.out_dir.clone(),
        }
        .into());
    }
    fs::create_dir_all(&args.out_dir)?;
    let progress = ProgressLog::create(&args.log_file)?;

    let observations = load_pointings(&args.pointings)?;
    info!(
        "loaded {} pointings from {}",
        observations.len(),
        args.pointings.display()
    );
    let partition = partition_observations(&observations, args.mesh_level);
    info!(
        "{} level-{} cells touched by the pointing list",
        partition.len(),
        args.mesh_level
    );
    progress.append(&format!(
        "run start: {} pointings over {} cells",
        observations.len(),
        partition.len()
    ))?;

    let bar = ProgressBar::new(partition.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ETA: {eta}")
            .unwrap()
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    bar.set_message("cells");

    let config = RunConfig {
        output_dir: args.out_dir.clone(),
        prefix: args.out_prefix.clone(),
        workers: args.n_proc,
        data_dir: args.data_dir.clone(),
        pipeline: PipelineConfig {
            dmag_cutoff: args.dmag_cutoff,
            chunk_limit: args.chunk_limit,
            ..PipelineConfig::default()
        },
    };
    let camera = MosaicCamera::default();
    let summary = run_cells(
        &config,
        &partition,
        &camera,
        |_| SqliteCatalog::open(&args.catalog, &args.table),
        &progress,
        |_| bar.inc(1),
    );
    bar.finish();

    let line = format!(
        "run complete: {} cells, {} alerts from {} rows scanned",
        summary.cells_done, summary.alerts, summary.rows_scanned
    );
    info!("{line}");
    progress.append(&line)?;
    if summary.failed_workers > 0 {
        anyhow::bail!("{} workers failed; see {}", summary.failed_workers, args.log_file.display());
    }
    Ok(())
}
