//! Folded light-curve models: RR Lyrae, Cepheids, eclipsing binaries.
//!
//! All three share the same machinery. A tabulated light curve is folded
//! at the object's period and each epoch is mapped to a phase in [0, 1)
//! relative to the reference epoch. They differ only in which parameter
//! names the table, whether the table's time axis is days or phase, and
//! whether the table holds magnitude offsets or flux ratios.

use ndarray::Array3;
use photom::Band;

use crate::cache::VariabilityCache;
use crate::descriptor::VarDescriptor;
use crate::engine::{EngineConfig, ObjectContext};
use crate::error::VarError;

/// Which folded family is being evaluated.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Family {
    RrLyrae,
    Cepheid,
    EclipsingBinary,
}

impl Family {
    fn file_key(self) -> &'static str {
        match self {
            Family::RrLyrae => "filename",
            Family::Cepheid | Family::EclipsingBinary => "lcfile",
        }
    }

    fn reference_key(self) -> &'static str {
        match self {
            Family::RrLyrae => "tStartMjd",
            Family::Cepheid | Family::EclipsingBinary => "t0",
        }
    }

    /// RR Lyrae tables carry time in days and are normalized at load;
    /// the other two are tabulated directly in phase.
    fn time_in_days(self) -> bool {
        matches!(self, Family::RrLyrae)
    }

    /// Eclipsing-binary tables hold flux ratios instead of magnitude
    /// offsets.
    fn is_flux_table(self) -> bool {
        matches!(self, Family::EclipsingBinary)
    }
}

pub(crate) fn apply(
    family: Family,
    config: &EngineConfig,
    cache: &mut VariabilityCache,
    ctx: &ObjectContext<'_>,
    rows: &[(usize, &VarDescriptor)],
    epochs: &[f64],
    dmag: &mut Array3<f64>,
) -> Result<(), VarError> {
    for &(row, desc) in rows {
        let id = ctx.ids[row];
        let name = desc.str_param(family.file_key(), id)?;
        let reference = desc.f64_param(family.reference_key(), id)?;
        let path = config.data_dir.join(name);
        let curve = cache.periodic_curve(&path, family.time_in_days())?;

        // An explicit period parameter overrides the one inferred from
        // the table's span.
        let period = match desc.opt_f64_param("period", id)? {
            Some(p) => p,
            None => curve.period,
        };
        if period <= 0.0 {
            return Err(VarError::BadParam {
                name: "period".to_string(),
                object_id: id,
                expected: "positive number",
            });
        }

        for (j, &mjd) in epochs.iter().enumerate() {
            let cycles = (mjd - reference) / period;
            let phase = cycles - cycles.floor();
            for band in Band::ALL {
                let value = curve.splines[band].evaluate(phase);
                let offset = if family.is_flux_table() {
                    if value <= 0.0 {
                        return Err(VarError::NegativeFluxRatio { path: path.clone() });
                    }
                    -2.5 * value.log10()
                } else {
                    value
                };
                dmag[[band.index(), row, j]] = offset;
            }
        }
    }
    Ok(())
}
