//! Passbands and point-source photometry for the alert pipeline.
//!
//! Fixes the six-band (u, g, r, i, z, y) ordering used by every array in
//! the workspace and provides AB flux/magnitude conversion plus the
//! SNR-at-depth noise model. Pure functions only; bandpass throughput
//! loading is deliberately out of scope.

pub mod bands;
pub mod flux;

pub use bands::{Band, PerBand, UnknownBand};
pub use flux::{
    flux_from_mag, mag_from_flux, snr_at_depth, AB_ZEROPOINT_JY, NOMINAL_M5, SNR_GAMMA,
};
