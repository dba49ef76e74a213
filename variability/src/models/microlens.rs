//! Gravitational microlensing: achromatic brightening of a background
//! source.
//!
//! Stellar lenses use the closed-form point-lens magnification from the
//! impact parameter and Einstein-crossing time. Black-hole lenses come as
//! tabulated magnification curves instead and are spline-interpolated.
//! Either way the same offset lands in every band.

use ndarray::Array3;
use photom::Band;

use crate::cache::VariabilityCache;
use crate::descriptor::VarDescriptor;
use crate::engine::{EngineConfig, ObjectContext};
use crate::error::VarError;

/// Point-lens magnification at scaled impact parameter `u`.
fn point_lens_magnification(u: f64) -> f64 {
    let u2 = u * u;
    (u2 + 2.0) / (u * (u2 + 4.0).sqrt())
}

pub(crate) fn apply_point_lens(
    ctx: &ObjectContext<'_>,
    rows: &[(usize, &VarDescriptor)],
    epochs: &[f64],
    dmag: &mut Array3<f64>,
) -> Result<(), VarError> {
    for &(row, desc) in rows {
        let id = ctx.ids[row];
        let umin = desc.f64_param("umin", id)?;
        let einstein_days = desc.f64_param("that", id)?;
        let peak_mjd = desc.f64_param("t0", id)?;
        if einstein_days <= 0.0 {
            return Err(VarError::BadParam {
                name: "that".to_string(),
                object_id: id,
                expected: "positive number",
            });
        }
        for (j, &mjd) in epochs.iter().enumerate() {
            let shifted = 2.0 * (mjd - peak_mjd) / einstein_days;
            let u = (umin * umin + shifted * shifted).sqrt();
            let offset = -2.5 * point_lens_magnification(u).log10();
            for band in Band::ALL {
                dmag[[band.index(), row, j]] = offset;
            }
        }
    }
    Ok(())
}

pub(crate) fn apply_tabulated(
    config: &EngineConfig,
    cache: &mut VariabilityCache,
    ctx: &ObjectContext<'_>,
    rows: &[(usize, &VarDescriptor)],
    epochs: &[f64],
    dmag: &mut Array3<f64>,
) -> Result<(), VarError> {
    for &(row, desc) in rows {
        let id = ctx.ids[row];
        let name = desc.str_param("filename", id)?;
        let reference = desc.f64_param("t0", id)?;
        let path = config.data_dir.join(name);
        let curve = cache.magnification_curve(&path)?;
        for (j, &mjd) in epochs.iter().enumerate() {
            let magnification = curve.spline.evaluate(mjd - reference);
            if magnification <= 0.0 {
                return Err(VarError::NegativeFluxRatio { path: path.clone() });
            }
            let offset = -2.5 * magnification.log10();
            for band in Band::ALL {
                dmag[[band.index(), row, j]] = offset;
            }
        }
    }
    Ok(())
}
