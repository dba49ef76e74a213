//! AM CVn interacting binaries: a low-amplitude oscillation with
//! occasional outbursts.
//!
//! The baseline oscillation lands identically in every band. Objects
//! flagged as bursting get a train of exponentially decaying
//! brightenings scheduled over the first ten years past the reference
//! epoch, plus a constant blue excess weighted into u, g and r.

use ndarray::Array3;
use photom::Band;

use crate::descriptor::VarDescriptor;
use crate::engine::ObjectContext;
use crate::error::VarError;

/// Burst scheduling window past the reference epoch, in days.
const BURST_WINDOW_DAYS: f64 = 3652.5;

/// Weight of the burst-time color excess per band, u through y.
const BLUE_EXCESS: [f64; 6] = [2.0, 1.0, 0.5, 0.0, 0.0, 0.0];

fn positive_param(desc: &VarDescriptor, name: &str, id: i64) -> Result<f64, VarError> {
    let value = desc.f64_param(name, id)?;
    if value <= 0.0 {
        return Err(VarError::BadParam {
            name: name.to_string(),
            object_id: id,
            expected: "positive number",
        });
    }
    Ok(value)
}

/// Burst origin times: evenly spaced from one burst interval past the
/// reference epoch through the end of the scheduling window, endpoints
/// included.
fn burst_origins(t0: f64, burst_interval: f64) -> Vec<f64> {
    let count = (BURST_WINDOW_DAYS / burst_interval).ceil() as usize;
    let start = t0 + burst_interval;
    let stop = t0 + BURST_WINDOW_DAYS;
    if count < 2 {
        return vec![start];
    }
    let spacing = (stop - start) / (count - 1) as f64;
    (0..count).map(|i| start + spacing * i as f64).collect()
}

pub(crate) fn apply(
    ctx: &ObjectContext<'_>,
    rows: &[(usize, &VarDescriptor)],
    epochs: &[f64],
    dmag: &mut Array3<f64>,
) -> Result<(), VarError> {
    for &(row, desc) in rows {
        let id = ctx.ids[row];
        let does_burst = desc.flag_param("does_burst", id)?;
        let t0 = desc.f64_param("t0", id)?;
        let amplitude = desc.f64_param("amplitude", id)?;
        let period = positive_param(desc, "period", id)?;

        let bursts = if does_burst {
            let amp_burst = desc.f64_param("amp_burst", id)?;
            let burst_interval = positive_param(desc, "burst_freq", id)?;
            let burst_scale = positive_param(desc, "burst_scale", id)?;
            let color_excess = desc.f64_param("color_excess_during_burst", id)?;
            Some((
                amp_burst,
                burst_scale,
                color_excess,
                burst_origins(t0, burst_interval),
            ))
        } else {
            None
        };

        for (j, &mjd) in epochs.iter().enumerate() {
            let baseline = amplitude * ((mjd - t0) / period).cos();
            let (burst_term, excess) = match &bursts {
                Some((amp_burst, burst_scale, color_excess, origins)) => {
                    let mut adds = 0.0;
                    for &origin in origins {
                        // Decay sets in one scale time after the origin;
                        // the rising side of the exponential is masked off.
                        let decay = (1.0 - (mjd - origin) / burst_scale).exp();
                        if decay < 1.0 {
                            adds -= amp_burst * decay;
                        }
                    }
                    (adds, *color_excess)
                }
                None => (0.0, 0.0),
            };
            // Bursting objects carry the blue excess at every epoch, not
            // only while a burst is decaying.
            for band in Band::ALL {
                dmag[[band.index(), row, j]] =
                    baseline + burst_term + BLUE_EXCESS[band.index()] * excess;
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

    fn quiet_descriptor() -> VarDescriptor {
        VarDescriptor::parse(
            r#"{"varMethodName": "applyAmcvn",
                "pars": {"does_burst": 0, "t0": 51000.0, "amplitude": 0.05,
                         "period": 0.02}}"#,
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn quiet_object_oscillates_identically_in_all_bands() {
        let desc = quiet_descriptor();
        let (ids, descs, plx, mags) = context_of_one(desc.clone());
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descs,
            parallax_rad: &plx,
            quiescent_mags: mags.view(),
        };
        let rows = [(0usize, &desc)];

        let epochs = [51000.0, 51000.007];
        let mut dmag = Array3::zeros((Band::COUNT, 1, 2));
        apply(&ctx, &rows, &epochs, &mut dmag).unwrap();

        assert_relative_eq!(dmag[[0, 0, 0]], 0.05, epsilon = 1e-12);
        let expected = 0.05 * (0.007f64 / 0.02).cos();
        for band in Band::ALL {
            assert_relative_eq!(dmag[[band.index(), 0, 1]], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn burst_decay_dims_every_band_equally() {
        let desc = VarDescriptor::parse(
            r#"{"varMethodName": "applyAmcvn",
                "pars": {"does_burst": 1, "t0": 51000.0, "amplitude": 0.0,
                         "period": 1.0, "amp_burst": 1.5, "burst_freq": 500.0,
                         "burst_scale": 20.0,
                         "color_excess_during_burst": 0.0}}"#,
        )
        .unwrap()
        .unwrap();
        let (ids, descs, plx, mags) = context_of_one(desc.clone());
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descs,
            parallax_rad: &plx,
            quiescent_mags: mags.view(),
        };
        let rows = [(0usize, &desc)];

        // Two scale times after the first burst origin at t0 + 500.
        let epochs = [51540.0];
        let mut dmag = Array3::zeros((Band::COUNT, 1, 1));
        apply(&ctx, &rows, &epochs, &mut dmag).unwrap();

        let u = dmag[[0, 0, 0]];
        assert!(u < 0.0, "bursts brighten, got {u}");
        for band in Band::ALL {
            assert_relative_eq!(dmag[[band.index(), 0, 0]], u, epsilon = 1e-12);
        }
    }

    #[test]
    fn color_excess_shifts_only_the_blue_bands() {
        let desc = VarDescriptor::parse(
            r#"{"varMethodName": "applyAmcvn",
                "pars": {"does_burst": 1, "t0": 51000.0, "amplitude": 0.0,
                         "period": 1.0, "amp_burst": 1.5, "burst_freq": 2000.0,
                         "burst_scale": 5.0,
                         "color_excess_during_burst": 0.3}}"#,
        )
        .unwrap()
        .unwrap();
        let (ids, descs, plx, mags) = context_of_one(desc.clone());
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descs,
            parallax_rad: &plx,
            quiescent_mags: mags.view(),
        };
        let rows = [(0usize, &desc)];

        // Well before the first origin at t0 + 2000 the rising side is
        // masked; only the constant excess is left.
        let epochs = [51100.0];
        let mut dmag = Array3::zeros((Band::COUNT, 1, 1));
        apply(&ctx, &rows, &epochs, &mut dmag).unwrap();
        assert_relative_eq!(dmag[[0, 0, 0]], 0.6, epsilon = 1e-12);
        assert_relative_eq!(dmag[[1, 0, 0]], 0.3, epsilon = 1e-12);
        assert_relative_eq!(dmag[[2, 0, 0]], 0.15, epsilon = 1e-12);
        for red in 3..6 {
            assert_eq!(dmag[[red, 0, 0]], 0.0);
        }
    }
}
