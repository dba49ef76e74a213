//! Per-worker caches for variability state.
//!
//! Two kinds of state live here. Light-curve tables (periodic curves,
//! magnification curves, flare templates) are immutable once loaded and are
//! shared through [`Arc`] so repeated lookups hand out the same allocation.
//! Damped-random-walk states are mutable resume points keyed by the walk's
//! parameter string; they let a later evaluation continue a walk instead of
//! regenerating it from the reference epoch.
//!
//! The cache is not shared between workers. Each worker owns one and the
//! walk entries it accumulates are bounded by `walk_capacity`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use photom::PerBand;
use rand::rngs::StdRng;

use crate::error::VarError;
use crate::lightcurve::{FlareTemplate, MagnificationCurve, PeriodicCurve};

/// Resume point for one damped random walk.
///
/// `mjd` is the walk-grid epoch the state was captured at, `offsets` the
/// magnitude offsets at that epoch, and `rng` the generator mid-stream so
/// the continuation draws the same deviates a from-scratch run would.
#[derive(Debug, Clone)]
pub struct WalkState {
    pub mjd: f64,
    pub offsets: PerBand<f64>,
    pub rng: StdRng,
}

/// Owns all cached variability state for one worker.
pub struct VariabilityCache {
    walks: HashMap<String, WalkState>,
    walk_capacity: usize,
    periodic: HashMap<PathBuf, Arc<PeriodicCurve>>,
    magnification: HashMap<PathBuf, Arc<MagnificationCurve>>,
    templates: HashMap<String, Arc<FlareTemplate>>,
}

impl VariabilityCache {
    pub fn new(walk_capacity: usize) -> Self {
        Self {
            walks: HashMap::new(),
            walk_capacity,
            periodic: HashMap::new(),
            magnification: HashMap::new(),
            templates: HashMap::new(),
        }
    }

    /// Drops every cached entry, both tables and walk states.
    pub fn reset(&mut self) {
        self.walks.clear();
        self.periodic.clear();
        self.magnification.clear();
        self.templates.clear();
    }

    pub fn walk_state(&self, key: &str) -> Option<&WalkState> {
        self.walks.get(key)
    }

    /// Stores a walk resume point. When the insert pushes the map past
    /// capacity the whole map is cleared; the states are a pure shortcut,
    /// so dropping them only costs recomputation.
    pub fn store_walk(&mut self, key: String, state: WalkState) {
        self.walks.insert(key, state);
        if self.walks.len() > self.walk_capacity {
            self.walks.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn walk_len(&self) -> usize {
        self.walks.len()
    }

    /// Loads a periodic light-curve table, reusing the parsed copy when the
    /// same file was seen before.
    pub fn periodic_curve(
        &mut self,
        path: &Path,
        time_in_days: bool,
    ) -> Result<Arc<PeriodicCurve>, VarError> {
        if let Some(curve) = self.periodic.get(path) {
            return Ok(Arc::clone(curve));
        }
        let curve = PeriodicCurve::load(path, time_in_days)?;
        self.periodic.insert(path.to_path_buf(), Arc::clone(&curve));
        Ok(curve)
    }

    pub fn magnification_curve(&mut self, path: &Path) -> Result<Arc<MagnificationCurve>, VarError> {
        if let Some(curve) = self.magnification.get(path) {
            return Ok(Arc::clone(curve));
        }
        let curve = MagnificationCurve::load(path)?;
        self.magnification
            .insert(path.to_path_buf(), Arc::clone(&curve));
        Ok(curve)
    }

    /// Loads the flare template named by `key` (the light-curve parameter
    /// with any `.txt` suffix stripped) from `dir`.
    pub fn flare_template(&mut self, key: &str, dir: &Path) -> Result<Arc<FlareTemplate>, VarError> {
        if let Some(template) = self.templates.get(key) {
            return Ok(Arc::clone(template));
        }
        let path = dir.join(format!("{key}.txt"));
        if !path.is_file() {
            return Err(VarError::MissingTemplate {
                key: key.to_string(),
                dir: dir.to_path_buf(),
            });
        }
        let template = FlareTemplate::load(&path)?;
        self.templates.insert(key.to_string(), Arc::clone(&template));
        Ok(template)
    }
}
