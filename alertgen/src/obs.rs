//! Telescope pointings and the JSON pointing-list loader.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use photom::{Band, PerBand, NOMINAL_M5};
use serde::Deserialize;
use skymesh::Equatorial;

use crate::error::PipelineError;

/// One survey exposure: where the telescope pointed, when, and how deep.
///
/// Immutable once constructed. Depths default to the nominal survey
/// values; a pointing list may override individual bands.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Survey field id, unique across the run.
    pub obs_id: i64,
    pub pointing: Equatorial,
    /// Exposure midpoint, MJD (TAI).
    pub mjd: f64,
    pub band: Band,
    /// Field-of-view half-angle in radians.
    pub fov_radius: f64,
    /// 5-sigma depths per band for this exposure.
    pub m5: PerBand<f64>,
}

impl Observation {
    pub fn new(obs_id: i64, pointing: Equatorial, mjd: f64, band: Band, fov_radius: f64) -> Self {
        Observation {
            obs_id,
            pointing,
            mjd,
            band,
            fov_radius,
            m5: NOMINAL_M5,
        }
    }

    /// Depth in this observation's own band.
    pub fn depth(&self) -> f64 {
        self.m5[self.band]
    }
}

#[derive(Deserialize)]
struct PointingRecord {
    obs_id: i64,
    ra_deg: f64,
    dec_deg: f64,
    mjd: f64,
    band: Band,
    fov_deg: f64,
    /// Per-band 5-sigma depth overrides; unlisted bands stay nominal.
    #[serde(default)]
    m5: HashMap<Band, f64>,
}

/// Load a JSON pointing list: an array of records with `obs_id`,
/// `ra_deg`, `dec_deg`, `mjd`, `band`, `fov_deg`, and an optional `m5`
/// band-to-depth map.
pub fn load_pointings(path: &Path) -> Result<Vec<Observation>, PipelineError> {
    let text = fs::read_to_string(path)?;
    let records: Vec<PointingRecord> = serde_json::from_str(&text)?;
    if records.is_empty() {
        return Err(PipelineError::PointingList {
            path: path.to_path_buf(),
            reason: "no pointings".to_string(),
        });
    }
    Ok(records
        .into_iter()
        .map(|r| {
            let mut obs = Observation::new(
                r.obs_id,
                Equatorial::from_degrees(r.ra_deg, r.dec_deg),
                r.mjd,
                r.band,
                r.fov_deg.to_radians(),
            );
            for (band, depth) in r.m5 {
                obs.m5[band] = depth;
            }
            obs
        })
        .collect())
}
