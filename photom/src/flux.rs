//! AB magnitude/flux conversion and the point-source noise model.
//!
//! Fluxes are in Jansky on the AB scale. The signal-to-noise model is the
//! standard survey form: with x = 10^(0.4 (m - m5)), the relative flux
//! variance is (0.04 - gamma) x + gamma x^2, which pins SNR = 5 exactly at
//! the 5-sigma depth m5. gamma absorbs the detector gain and sky level and
//! sits near 0.039 for all six bands.

use crate::bands::PerBand;

/// AB zero-point flux in Jansky (magnitude 0).
pub const AB_ZEROPOINT_JY: f64 = 3631.0;

/// Default SNR model gamma, shared by all bands.
pub const SNR_GAMMA: f64 = 0.039;

/// Nominal single-visit 5-sigma depths per band, used as the detection
/// limit for quiescent fluxes and the photometric gate.
pub const NOMINAL_M5: PerBand<f64> = PerBand([23.68, 24.89, 24.43, 24.0, 24.45, 22.60]);

/// AB flux in Jansky of a source of magnitude `mag`.
pub fn flux_from_mag(mag: f64) -> f64 {
    AB_ZEROPOINT_JY * 10f64.powf(-0.4 * mag)
}

/// AB magnitude of a flux in Jansky.
pub fn mag_from_flux(flux: f64) -> f64 {
    -2.5 * (flux / AB_ZEROPOINT_JY).log10()
}

/// Signal-to-noise of a point source of magnitude `mag` in an exposure
/// with 5-sigma depth `m5`.
pub fn snr_at_depth(mag: f64, m5: f64, gamma: f64) -> f64 {
    let x = 10f64.powf(0.4 * (mag - m5));
    1.0 / ((0.04 - gamma) * x + gamma * x * x).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use float_cmp::approx_eq;

    #[test]
    fn zero_magnitude_is_the_zeropoint() {
        assert_relative_eq!(flux_from_mag(0.0), AB_ZEROPOINT_JY, epsilon = 1e-9);
    }

    #[test]
    fn mag_flux_round_trip() {
        for mag in [-1.0, 0.0, 14.2, 20.0, 27.5] {
            assert!(approx_eq!(
                f64,
                mag_from_flux(flux_from_mag(mag)),
                mag,
                epsilon = 1e-12
            ));
        }
    }

    #[test]
    fn five_magnitudes_is_a_factor_of_hundred() {
        let ratio = flux_from_mag(15.0) / flux_from_mag(20.0);
        assert_relative_eq!(ratio, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn snr_is_five_at_the_depth() {
        for m5 in [22.0, 24.43, 26.0] {
            assert_relative_eq!(snr_at_depth(m5, m5, SNR_GAMMA), 5.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn snr_falls_with_fainter_sources() {
        let bright = snr_at_depth(18.0, 24.0, SNR_GAMMA);
        let mid = snr_at_depth(21.0, 24.0, SNR_GAMMA);
        let faint = snr_at_depth(25.0, 24.0, SNR_GAMMA);
        assert!(bright > mid && mid > faint);
        assert!(faint < 5.0 && bright > 5.0);
    }

    #[test]
    fn nominal_depths_match_band_order() {
        use crate::bands::Band;
        assert_relative_eq!(NOMINAL_M5[Band::G], 24.89);
        assert_relative_eq!(NOMINAL_M5[Band::Y], 22.60);
    }
}
