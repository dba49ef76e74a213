//! Damped-random-walk magnitude offsets for AGN.
//!
//! The walk advances on a fixed grid of tau/100-day steps from the
//! object's reference epoch, drawing one unit normal per step that is
//! shared across bands and scaled by the per-band structure function.
//! Requested epochs are linearly interpolated between the bracketing
//! grid points.
//!
//! Walks are seeded, so a walk regenerated from scratch reproduces the
//! same offsets bit for bit. The cache only short-circuits that replay:
//! a stored state is resumed when it does not overshoot the first
//! requested epoch and is regenerated otherwise.

use ndarray::Array3;
use photom::{Band, PerBand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::cache::{VariabilityCache, WalkState};
use crate::descriptor::VarDescriptor;
use crate::engine::{EngineConfig, ObjectContext};
use crate::error::VarError;

struct WalkParams {
    reference_mjd: f64,
    tau: f64,
    structure: PerBand<f64>,
    seed: u64,
}

impl WalkParams {
    fn from_descriptor(desc: &VarDescriptor, id: i64) -> Result<Self, VarError> {
        let reference_mjd = desc.f64_param("t0_mjd", id)?;
        let tau = desc.f64_param("agn_tau", id)?;
        if tau <= 0.0 {
            return Err(VarError::BadParam {
                name: "agn_tau".to_string(),
                object_id: id,
                expected: "positive number",
            });
        }
        let seed = desc.u64_param("seed", id)?;
        let mut structure = PerBand::splat(0.0);
        for band in Band::ALL {
            structure[band] = desc.f64_param(&format!("agn_sf{}", band.name()), id)?;
        }
        Ok(WalkParams {
            reference_mjd,
            tau,
            structure,
            seed,
        })
    }

    /// Cache key: every quantity that shapes the walk. Two descriptors
    /// with the same key describe the same walk.
    fn cache_key(&self) -> String {
        let s = &self.structure;
        format!(
            "{}_{}_{}_{}_{}_{}_{}_{}_{}",
            self.seed,
            s[Band::U],
            s[Band::G],
            s[Band::R],
            s[Band::I],
            s[Band::Z],
            s[Band::Y],
            self.tau,
            self.reference_mjd,
        )
    }

    fn fresh_state(&self) -> WalkState {
        WalkState {
            mjd: self.reference_mjd,
            offsets: PerBand::splat(0.0),
            rng: StdRng::seed_from_u64(self.seed),
        }
    }
}

/// One Euler step of the damped walk.
fn step(state: &mut WalkState, params: &WalkParams, dt: f64) {
    let dtn = dt / params.tau;
    let unit: f64 = state.rng.sample(StandardNormal);
    let scaled = unit * dtn.sqrt();
    for band in Band::ALL {
        let dx = state.offsets[band];
        state.offsets[band] = dx - dx * dtn + params.structure[band] * scaled;
    }
    state.mjd += dt;
}

pub(crate) fn apply(
    config: &EngineConfig,
    cache: &mut VariabilityCache,
    ctx: &ObjectContext<'_>,
    rows: &[(usize, &VarDescriptor)],
    epochs: &[f64],
    dmag: &mut Array3<f64>,
) -> Result<(), VarError> {
    let first_epoch = epochs[0];
    for &(row, desc) in rows {
        let id = ctx.ids[row];
        let params = WalkParams::from_descriptor(desc, id)?;
        if first_epoch < params.reference_mjd {
            return Err(VarError::EpochBeforeReference {
                epoch: first_epoch,
                reference: params.reference_mjd,
                object_id: id,
            });
        }

        let key = params.cache_key();
        let mut state = match cache.walk_state(&key) {
            Some(cached) if cached.mjd <= first_epoch => cached.clone(),
            _ => params.fresh_state(),
        };

        let dt = params.tau / 100.0;
        let mut previous: Option<(f64, PerBand<f64>)> = None;
        for (j, &mjd) in epochs.iter().enumerate() {
            while state.mjd < mjd {
                previous = Some((state.mjd, state.offsets));
                step(&mut state, &params, dt);
            }
            let offsets = match previous {
                Some((prev_mjd, prev_offsets)) if state.mjd > mjd => {
                    let frac = (mjd - prev_mjd) / (state.mjd - prev_mjd);
                    PerBand::from_fn(|band| {
                        prev_offsets[band] + frac * (state.offsets[band] - prev_offsets[band])
                    })
                }
                _ => state.offsets,
            };
            for band in Band::ALL {
                dmag[[band.index(), row, j]] = offsets[band];
            }
        }
        cache.store_walk(key, state);
    }
    Ok(())
}
