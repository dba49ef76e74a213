//! Per-cell SQLite alert stores.
//!
//! Each cell writes one database file holding the alert rows plus the
//! cell's observation metadata, per-object quiescent fluxes, and
//! baseline astrometry. Every flush is one transaction, so an
//! interrupted run leaves the store at its last committed flush.
//! Indices are built exactly once, after the cell's final write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use photom::PerBand;
use rusqlite::{params, Connection};
use skymesh::TrixelId;

use crate::error::PipelineError;
use crate::obs::Observation;

/// One detected magnitude change of one object in one exposure.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub unique_id: i64,
    pub obs_id: i64,
    pub x_pix: f64,
    pub y_pix: f64,
    pub chip_num: i64,
    /// Observed minus quiescent flux in the exposure's band, Jansky.
    pub dflux: f64,
    pub snr: f64,
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// Alert rows buffered between flushes, grouped by observation.
#[derive(Debug, Default)]
pub struct OutputBatch {
    per_obs: HashMap<i64, Vec<AlertRecord>>,
    len: usize,
}

impl OutputBatch {
    pub fn push(&mut self, record: AlertRecord) {
        self.per_obs.entry(record.obs_id).or_default().push(record);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn take(&mut self) -> HashMap<i64, Vec<AlertRecord>> {
        self.len = 0;
        std::mem::take(&mut self.per_obs)
    }
}

/// Once-per-object baseline written alongside the object's first alert
/// in a cell.
#[derive(Debug, Clone)]
pub struct BaselineRecord {
    pub unique_id: i64,
    /// Quiescent flux per band, Jansky.
    pub quiescent_flux: PerBand<f64>,
    /// SNR of the quiescent flux against the nominal per-band depths.
    pub quiescent_snr: PerBand<f64>,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub pm_ra_mas: f64,
    pub pm_dec_mas: f64,
    pub parallax_mas: f64,
    /// Epoch of the quoted position, MJD.
    pub reference_mjd: f64,
}

const SCHEMA: &str = "
CREATE TABLE alert_data (uniqueId int, obshistId int, xPix float, yPix float,
                         chipNum int, dflux float, snr float, ra float, dec float);
CREATE TABLE metadata (obshistId int, TAI float, band int);
CREATE TABLE quiescent_flux (uniqueId int, band int, flux float, snr float);
CREATE TABLE baseline_astrometry (uniqueId int, ra real, dec real,
                                  pmRA real, pmDec real, parallax real, TAI real);
";

/// Writer for one cell's store file, `<prefix>_<cell>_sqlite.db`.
#[derive(Debug)]
pub struct AlertStore {
    conn: Connection,
    path: PathBuf,
    alert_rows: u64,
}

impl AlertStore {
    /// Create the store and record the cell's observations. Refuses to
    /// touch a file that already exists.
    pub fn open(
        dir: &Path,
        prefix: &str,
        cell: TrixelId,
        observations: &[Observation],
    ) -> Result<Self, PipelineError> {
        let path = dir.join(format!("{prefix}_{cell}_sqlite.db"));
        if path.exists() {
            return Err(PipelineError::StoreExists { path });
        }
        let mut conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare("INSERT INTO metadata VALUES (?1, ?2, ?3)")?;
            for obs in observations {
                insert.execute(params![obs.obs_id, obs.mjd, obs.band.index() as i64])?;
            }
        }
        tx.commit()?;

        Ok(AlertStore {
            conn,
            path,
            alert_rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Alert rows committed so far.
    pub fn alert_rows(&self) -> u64 {
        self.alert_rows
    }

    /// Commit and clear the batch; returns the rows written.
    pub fn write_alerts(&mut self, batch: &mut OutputBatch) -> Result<usize, PipelineError> {
        let per_obs = batch.take();
        if per_obs.is_empty() {
            return Ok(0);
        }
        let mut written = 0;
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO alert_data VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for records in per_obs.values() {
                for r in records {
                    insert.execute(params![
                        r.unique_id,
                        r.obs_id,
                        r.x_pix,
                        r.y_pix,
                        r.chip_num,
                        r.dflux,
                        r.snr,
                        r.ra_deg,
                        r.dec_deg
                    ])?;
                    written += 1;
                }
            }
        }
        tx.commit()?;
        self.alert_rows += written as u64;
        Ok(written)
    }

    /// Commit one chunk's baselines: six quiescent-flux rows and one
    /// astrometry row per object.
    pub fn write_baselines(&mut self, records: &[BaselineRecord]) -> Result<(), PipelineError> {
        if records.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut flux = tx.prepare_cached("INSERT INTO quiescent_flux VALUES (?1, ?2, ?3, ?4)")?;
            let mut astrometry = tx.prepare_cached(
                "INSERT INTO baseline_astrometry VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for r in records {
                for (band, value) in r.quiescent_flux.iter() {
                    flux.execute(params![
                        r.unique_id,
                        band.index() as i64,
                        value,
                        r.quiescent_snr[band]
                    ])?;
                }
                astrometry.execute(params![
                    r.unique_id,
                    r.ra_deg,
                    r.dec_deg,
                    r.pm_ra_mas,
                    r.pm_dec_mas,
                    r.parallax_mas,
                    r.reference_mjd
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Build the query indices; call once, after the last write.
    pub fn build_indices(&mut self) -> Result<(), PipelineError> {
        self.conn.execute_batch(
            "CREATE INDEX unq_obs ON alert_data (uniqueId, obshistId);
             CREATE INDEX unq_flux ON quiescent_flux (uniqueId, band);
             CREATE INDEX obs ON metadata (obshistId);
             CREATE INDEX unq_ast ON baseline_astrometry (uniqueId);",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use photom::Band;
    use skymesh::Equatorial;

    fn two_observations() -> Vec<Observation> {
        vec![
            Observation::new(
                901,
                Equatorial::from_degrees(30.0, -10.0),
                59580.0,
                Band::R,
                1.75f64.to_radians(),
            ),
            Observation::new(
                902,
                Equatorial::from_degrees(30.0, -10.0),
                59581.0,
                Band::G,
                1.75f64.to_radians(),
            ),
        ]
    }

    fn record(unique_id: i64, obs_id: i64, dflux: f64) -> AlertRecord {
        AlertRecord {
            unique_id,
            obs_id,
            x_pix: 100.0,
            y_pix: 200.0,
            chip_num: 2211,
            dflux,
            snr: 50.0,
            ra_deg: 30.0,
            dec_deg: -10.0,
        }
    }

    #[test]
    fn open_records_the_observations() {
        let dir = tempfile::tempdir().unwrap();
        let store = AlertStore::open(dir.path(), "alerts", 9345, &two_observations()).unwrap();
        assert!(store.path().ends_with("alerts_9345_sqlite.db"));

        let conn = Connection::open(store.path()).unwrap();
        let rows: Vec<(i64, f64, i64)> = conn
            .prepare("SELECT obshistId, TAI, band FROM metadata ORDER BY obshistId")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 901);
        assert_relative_eq!(rows[0].1, 59580.0);
        assert_eq!(rows[0].2, Band::R.index() as i64);
        assert_eq!(rows[1].2, Band::G.index() as i64);
    }

    #[test]
    fn refuses_an_existing_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let _store = AlertStore::open(dir.path(), "alerts", 8, &two_observations()).unwrap();
        let err = AlertStore::open(dir.path(), "alerts", 8, &two_observations()).unwrap_err();
        assert!(matches!(err, PipelineError::StoreExists { .. }));
    }

    #[test]
    fn flush_commits_the_batch_and_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = AlertStore::open(dir.path(), "alerts", 8, &two_observations()).unwrap();

        let mut batch = OutputBatch::default();
        batch.push(record(1, 901, 0.5));
        batch.push(record(2, 901, -0.25));
        batch.push(record(1, 902, 0.125));
        assert_eq!(batch.len(), 3);

        assert_eq!(store.write_alerts(&mut batch).unwrap(), 3);
        assert!(batch.is_empty());
        assert_eq!(store.write_alerts(&mut batch).unwrap(), 0);
        assert_eq!(store.alert_rows(), 3);

        let conn = Connection::open(store.path()).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM alert_data", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn baselines_write_six_flux_rows_and_one_astrometry_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = AlertStore::open(dir.path(), "alerts", 8, &two_observations()).unwrap();

        store
            .write_baselines(&[BaselineRecord {
                unique_id: 11,
                quiescent_flux: PerBand::from_fn(|b| 1000.0 + b.index() as f64),
                quiescent_snr: PerBand::splat(40.0),
                ra_deg: 30.0,
                dec_deg: -10.0,
                pm_ra_mas: 5.0,
                pm_dec_mas: -3.0,
                parallax_mas: 1.5,
                reference_mjd: 59580.0,
            }])
            .unwrap();

        let conn = Connection::open(store.path()).unwrap();
        let flux_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM quiescent_flux WHERE uniqueId = 11", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(flux_rows, 6);
        let r_flux: f64 = conn
            .query_row(
                "SELECT flux FROM quiescent_flux WHERE uniqueId = 11 AND band = 2",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_relative_eq!(r_flux, 1002.0);
        let (parallax, tai): (f64, f64) = conn
            .query_row(
                "SELECT parallax, TAI FROM baseline_astrometry WHERE uniqueId = 11",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_relative_eq!(parallax, 1.5);
        assert_relative_eq!(tai, 59580.0);
    }

    #[test]
    fn indices_appear_after_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = AlertStore::open(dir.path(), "alerts", 8, &two_observations()).unwrap();
        store.build_indices().unwrap();

        let conn = Connection::open(store.path()).unwrap();
        let names: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' ORDER BY name")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names, ["obs", "unq_ast", "unq_flux", "unq_obs"]);
    }
}
