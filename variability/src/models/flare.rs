//! M/L/T-dwarf flaring from tabulated flux templates.
//!
//! Templates live under `flare_templates/` in the reference tree and
//! tabulate per-band flux excesses for a decade of simulated activity.
//! An object's template time is anchored to the survey start, shifted by
//! its phase offset, and wrapped back into the tabulated span so the
//! activity repeats. The flux excess is diluted by the object's distance
//! (from its parallax) and the telescope collecting area, then expressed
//! as a magnitude offset against the quiescent magnitude.

use std::f64::consts::PI;

use log::warn;
use ndarray::Array3;
use photom::{flux_from_mag, mag_from_flux, Band};

use crate::cache::VariabilityCache;
use crate::descriptor::VarDescriptor;
use crate::engine::{EngineConfig, ObjectContext};
use crate::error::VarError;
use crate::lightcurve::interp_linear;

const ARCSEC_PER_RADIAN: f64 = 206265.0;
const CM_PER_PARSEC: f64 = 3.0857e18;

pub(crate) fn apply(
    config: &EngineConfig,
    cache: &mut VariabilityCache,
    ctx: &ObjectContext<'_>,
    rows: &[(usize, &VarDescriptor)],
    epochs: &[f64],
    dmag: &mut Array3<f64>,
) -> Result<(), VarError> {
    let template_dir = config.data_dir.join("flare_templates");
    for &(row, desc) in rows {
        let id = ctx.ids[row];
        let name = desc.str_param("lc", id)?;
        let key = name.trim_end_matches(".txt");
        let phase_offset = desc.f64_param("t0", id)?;

        let parallax = ctx.parallax_rad[row];
        if !parallax.is_finite() || parallax <= 0.0 {
            warn!("object {id}: unusable parallax {parallax}, flare offsets zeroed");
            continue;
        }

        let template = cache.flare_template(key, &template_dir)?;
        let distance_pc = 1.0 / (ARCSEC_PER_RADIAN * parallax);
        let sphere_cm2 = 4.0 * PI * (distance_pc * CM_PER_PARSEC).powi(2);
        let flux_factor = config.effective_area_cm2 / sphere_cm2;
        let span = template.t_max() - template.t_min();

        for (j, &mjd) in epochs.iter().enumerate() {
            let mut t = (mjd - config.survey_start_mjd) + phase_offset;
            if t > template.t_max() {
                let wraps = ((t - template.t_max()) / span).ceil();
                t -= wraps * span;
            }
            for band in Band::ALL {
                let quiescent_mag = ctx.quiescent_mags[[band.index(), row]];
                let base_flux = flux_from_mag(quiescent_mag);
                let excess = interp_linear(&template.time, &template.dflux[band], t);
                let flared = base_flux + excess * flux_factor;
                dmag[[band.index(), row, j]] = mag_from_flux(flared) - quiescent_mag;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::context_of_one;
    use approx::assert_relative_eq;
    use std::io::Write;

    /// Parallax of a source at 10 pc.
    const PLX_10PC_RAD: f64 = 0.1 / ARCSEC_PER_RADIAN;

    fn write_template(dir: &std::path::Path, name: &str) {
        let sub = dir.join("flare_templates");
        std::fs::create_dir_all(&sub).unwrap();
        let mut f = std::fs::File::create(sub.join(name)).unwrap();
        // Triangular flare peaking at t = 1 day, u band only.
        writeln!(f, "0.0 0.0 0.0 0.0 0.0 0.0 0.0").unwrap();
        writeln!(f, "1.0 1.0e30 0.0 0.0 0.0 0.0 0.0").unwrap();
        writeln!(f, "2.0 0.0 0.0 0.0 0.0 0.0 0.0").unwrap();
    }

    fn flare_descriptor() -> VarDescriptor {
        VarDescriptor::parse(
            r#"{"varMethodName": "applyMLTflaring",
                "pars": {"lc": "mid_active_0.txt", "t0": 0.0}}"#,
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn flare_peak_brightens_only_the_tabulated_band() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "mid_active_0.txt");
        let desc = flare_descriptor();
        let (ids, descs, mut plx, mags) = context_of_one(desc.clone());
        plx[0] = PLX_10PC_RAD;
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descs,
            parallax_rad: &plx,
            quiescent_mags: mags.view(),
        };
        let rows = [(0usize, &desc)];
        let config = EngineConfig::new(dir.path());
        let mut cache = VariabilityCache::new(8);

        // One day past survey start: the template peak.
        let epochs = [config.survey_start_mjd + 1.0];
        let mut dmag = Array3::zeros((Band::COUNT, 1, 1));
        apply(&config, &mut cache, &ctx, &rows, &epochs, &mut dmag).unwrap();

        let distance_cm = 10.0 * CM_PER_PARSEC;
        let flux_factor = config.effective_area_cm2 / (4.0 * PI * distance_cm * distance_cm);
        let base = flux_from_mag(20.0);
        let expected = mag_from_flux(base + 1.0e30 * flux_factor) - 20.0;
        assert!(expected < -0.01, "test template too faint: {expected}");
        assert_relative_eq!(dmag[[0, 0, 0]], expected, epsilon = 1e-9);
        for band in 1..Band::COUNT {
            assert!(dmag[[band, 0, 0]].abs() < 1e-9);
        }
    }

    #[test]
    fn template_time_wraps_back_into_the_tabulated_span() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "mid_active_0.txt");
        let desc = flare_descriptor();
        let (ids, descs, mut plx, mags) = context_of_one(desc.clone());
        plx[0] = PLX_10PC_RAD;
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descs,
            parallax_rad: &plx,
            quiescent_mags: mags.view(),
        };
        let rows = [(0usize, &desc)];
        let config = EngineConfig::new(dir.path());
        let mut cache = VariabilityCache::new(8);

        // 7 days past survey start wraps to t = 1, the same peak.
        let epochs = [
            config.survey_start_mjd + 1.0,
            config.survey_start_mjd + 7.0,
        ];
        let mut dmag = Array3::zeros((Band::COUNT, 1, 2));
        apply(&config, &mut cache, &ctx, &rows, &epochs, &mut dmag).unwrap();
        assert_relative_eq!(dmag[[0, 0, 1]], dmag[[0, 0, 0]], epsilon = 1e-9);
    }

    #[test]
    fn unusable_parallax_leaves_offsets_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "mid_active_0.txt");
        let desc = flare_descriptor();
        let (ids, descs, mut plx, mags) = context_of_one(desc.clone());
        plx[0] = 0.0;
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descs,
            parallax_rad: &plx,
            quiescent_mags: mags.view(),
        };
        let rows = [(0usize, &desc)];
        let config = EngineConfig::new(dir.path());
        let mut cache = VariabilityCache::new(8);

        let epochs = [config.survey_start_mjd + 1.0];
        let mut dmag = Array3::zeros((Band::COUNT, 1, 1));
        apply(&config, &mut cache, &ctx, &rows, &epochs, &mut dmag).unwrap();
        for band in Band::ALL {
            assert_eq!(dmag[[band.index(), 0, 0]], 0.0);
        }
    }

    #[test]
    fn missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("flare_templates")).unwrap();
        let desc = flare_descriptor();
        let (ids, descs, mut plx, mags) = context_of_one(desc.clone());
        plx[0] = PLX_10PC_RAD;
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descs,
            parallax_rad: &plx,
            quiescent_mags: mags.view(),
        };
        let rows = [(0usize, &desc)];
        let config = EngineConfig::new(dir.path());
        let mut cache = VariabilityCache::new(8);

        let epochs = [config.survey_start_mjd];
        let mut dmag = Array3::zeros((Band::COUNT, 1, 1));
        let err = apply(&config, &mut cache, &ctx, &rows, &epochs, &mut dmag).unwrap_err();
        assert!(matches!(err, VarError::MissingTemplate { .. }));
    }
}
