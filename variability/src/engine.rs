//! Evaluation entry point: route each object's descriptor to its model.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ndarray::{Array3, ArrayView2};
use photom::Band;

use crate::cache::VariabilityCache;
use crate::descriptor::{Model, VarDescriptor};
use crate::error::VarError;
use crate::models;
use crate::models::periodic::Family;

/// First night of survey operations, the template-time anchor for
/// flaring models.
pub const SURVEY_START_MJD: f64 = 59580.0;

/// Primary mirror diameter in cm; sets the default collecting area.
const MIRROR_DIAMETER_CM: f64 = 642.3;

/// Knobs shared by every model evaluation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the reference-file tree: light-curve tables resolve
    /// against it and flare templates live in its `flare_templates/`
    /// subdirectory.
    pub data_dir: PathBuf,
    /// Telescope collecting area in cm^2.
    pub effective_area_cm2: f64,
    pub survey_start_mjd: f64,
    /// Walk resume states kept per worker before the cache clears
    /// itself.
    pub walk_cache_capacity: usize,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        EngineConfig {
            data_dir: data_dir.into(),
            effective_area_cm2: std::f64::consts::PI * (MIRROR_DIAMETER_CM / 2.0).powi(2),
            survey_start_mjd: SURVEY_START_MJD,
            walk_cache_capacity: 1_000_000,
        }
    }
}

/// Borrowed per-object columns for one evaluation batch.
///
/// `quiescent_mags` is band-major with shape `(Band::COUNT, len)`; the
/// slices all share the same object order.
pub struct ObjectContext<'a> {
    pub ids: &'a [i64],
    pub descriptors: &'a [Option<VarDescriptor>],
    pub parallax_rad: &'a [f64],
    pub quiescent_mags: ArrayView2<'a, f64>,
}

impl ObjectContext<'_> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Evaluate every object's model at every epoch.
///
/// Returns magnitude offsets with shape `(Band::COUNT, objects, epochs)`;
/// rows without a descriptor stay zero. Epochs must be ascending, which
/// the walk models rely on. Objects are grouped by model so shared
/// light-curve tables are touched once per batch.
pub fn apply_variability(
    config: &EngineConfig,
    cache: &mut VariabilityCache,
    objects: &ObjectContext<'_>,
    epochs: &[f64],
) -> Result<Array3<f64>, VarError> {
    debug_assert_eq!(objects.ids.len(), objects.descriptors.len());
    debug_assert_eq!(objects.ids.len(), objects.parallax_rad.len());
    debug_assert_eq!(objects.quiescent_mags.dim(), (Band::COUNT, objects.len()));
    debug_assert!(epochs.windows(2).all(|w| w[0] <= w[1]));

    let mut dmag = Array3::zeros((Band::COUNT, objects.len(), epochs.len()));
    if objects.is_empty() || epochs.is_empty() {
        return Ok(dmag);
    }

    let mut groups: BTreeMap<Model, Vec<(usize, &VarDescriptor)>> = BTreeMap::new();
    for (row, descriptor) in objects.descriptors.iter().enumerate() {
        if let Some(descriptor) = descriptor {
            groups
                .entry(descriptor.model)
                .or_default()
                .push((row, descriptor));
        }
    }

    for (model, rows) in &groups {
        match model {
            Model::RrLyrae => models::periodic::apply(
                Family::RrLyrae,
                config,
                cache,
                objects,
                rows,
                epochs,
                &mut dmag,
            )?,
            Model::Cepheid => models::periodic::apply(
                Family::Cepheid,
                config,
                cache,
                objects,
                rows,
                epochs,
                &mut dmag,
            )?,
            Model::EclipsingBinary => models::periodic::apply(
                Family::EclipsingBinary,
                config,
                cache,
                objects,
                rows,
                epochs,
                &mut dmag,
            )?,
            Model::Microlens => models::microlens::apply_point_lens(objects, rows, epochs, &mut dmag)?,
            Model::BhMicrolens => {
                models::microlens::apply_tabulated(config, cache, objects, rows, epochs, &mut dmag)?
            }
            Model::Amcvn => models::amcvn::apply(objects, rows, epochs, &mut dmag)?,
            Model::MltFlare => {
                models::flare::apply(config, cache, objects, rows, epochs, &mut dmag)?
            }
            Model::Agn => models::walk::apply(config, cache, objects, rows, epochs, &mut dmag)?,
        }
    }
    Ok(dmag)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::Array2;
    use std::io::Write;

    /// One-object context columns: id 1, parallax for ~20 pc, quiescent
    /// magnitude 20 in every band.
    pub(crate) fn context_of_one(
        desc: VarDescriptor,
    ) -> (Vec<i64>, Vec<Option<VarDescriptor>>, Vec<f64>, Array2<f64>) {
        (
            vec![1],
            vec![Some(desc)],
            vec![0.05 / 206_265.0],
            Array2::from_elem((Band::COUNT, 1), 20.0),
        )
    }

    #[test]
    fn empty_batch_yields_an_empty_grid() {
        let config = EngineConfig::new("/nonexistent");
        let mut cache = VariabilityCache::new(4);
        let mags = Array2::zeros((Band::COUNT, 0));
        let ctx = ObjectContext {
            ids: &[],
            descriptors: &[],
            parallax_rad: &[],
            quiescent_mags: mags.view(),
        };
        let dmag = apply_variability(&config, &mut cache, &ctx, &[59580.0]).unwrap();
        assert_eq!(dmag.dim(), (Band::COUNT, 0, 1));
    }

    #[test]
    fn objects_without_descriptors_stay_quiescent() {
        let desc = VarDescriptor::parse(
            r#"{"varMethodName": "applyMicrolens",
                "pars": {"umin": 1.0, "that": 40.0, "t0": 59585.0}}"#,
        )
        .unwrap()
        .unwrap();
        let ids = vec![10, 11];
        let descriptors = vec![None, Some(desc)];
        let parallax = vec![0.0, 0.0];
        let mags = Array2::from_elem((Band::COUNT, 2), 21.0);
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descriptors,
            parallax_rad: &parallax,
            quiescent_mags: mags.view(),
        };
        let config = EngineConfig::new("/nonexistent");
        let mut cache = VariabilityCache::new(4);

        let dmag = apply_variability(&config, &mut cache, &ctx, &[59585.0]).unwrap();
        for band in Band::ALL {
            assert_eq!(dmag[[band.index(), 0, 0]], 0.0);
            assert!(dmag[[band.index(), 1, 0]] < -0.3);
        }
    }

    #[test]
    fn mixed_models_are_dispatched_per_object() {
        let dir = tempfile::tempdir().unwrap();
        let lc = dir.path().join("rrly_1.txt");
        let mut f = std::fs::File::create(&lc).unwrap();
        for i in 0..8 {
            let t = i as f64 * 0.125;
            writeln!(f, "{t} 0.25 0.25 0.25 0.25 0.25 0.25").unwrap();
        }

        let periodic = VarDescriptor::parse(
            r#"{"varMethodName": "applyRRly",
                "pars": {"filename": "rrly_1.txt", "tStartMjd": 59000.0}}"#,
        )
        .unwrap()
        .unwrap();
        let lens = VarDescriptor::parse(
            r#"{"varMethodName": "applyMicrolens",
                "pars": {"umin": 1.0, "that": 40.0, "t0": 59585.0}}"#,
        )
        .unwrap()
        .unwrap();

        let ids = vec![1, 2];
        let descriptors = vec![Some(periodic), Some(lens)];
        let parallax = vec![0.0, 0.0];
        let mags = Array2::from_elem((Band::COUNT, 2), 20.0);
        let ctx = ObjectContext {
            ids: &ids,
            descriptors: &descriptors,
            parallax_rad: &parallax,
            quiescent_mags: mags.view(),
        };
        let config = EngineConfig::new(dir.path());
        let mut cache = VariabilityCache::new(4);

        let dmag = apply_variability(&config, &mut cache, &ctx, &[59585.0]).unwrap();
        // Flat periodic table holds 0.25 everywhere.
        approx::assert_relative_eq!(dmag[[2, 0, 0]], 0.25, epsilon = 1e-9);
        assert!(dmag[[2, 1, 0]] < -0.3);
    }
}
