//! Tabulated light-curve files and the structures cached from them.
//!
//! Reference files are whitespace-separated ascii with `#` comments: a
//! time column followed by one column per band (u, g, r, i, z, y) for
//! light curves and flare templates, or a single magnification column for
//! lensing curves. Loaders validate shape and monotonic time so the
//! splines built from them can assume clean input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use photom::{Band, PerBand};

use crate::error::VarError;
use crate::spline::CubicSpline;

/// Parse `expected` whitespace-separated numeric columns from `path`.
pub fn load_columns(path: &Path, expected: usize) -> Result<Vec<Vec<f64>>, VarError> {
    let file = File::open(path).map_err(|e| VarError::LightCurve {
        path: path.to_path_buf(),
        reason: format!("open failed: {e}"),
    })?;
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); expected];
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != expected {
            return Err(VarError::LightCurve {
                path: path.to_path_buf(),
                reason: format!(
                    "line {}: expected {} columns, found {}",
                    line_no + 1,
                    expected,
                    fields.len()
                ),
            });
        }
        for (col, field) in columns.iter_mut().zip(&fields) {
            let value: f64 = field.parse().map_err(|_| VarError::LightCurve {
                path: path.to_path_buf(),
                reason: format!("line {}: bad number {field:?}", line_no + 1),
            })?;
            col.push(value);
        }
    }
    if columns[0].len() < 2 {
        return Err(VarError::LightCurve {
            path: path.to_path_buf(),
            reason: "fewer than 2 samples".to_string(),
        });
    }
    for pair in columns[0].windows(2) {
        if pair[1] <= pair[0] {
            return Err(VarError::LightCurve {
                path: path.to_path_buf(),
                reason: "time column is not strictly increasing".to_string(),
            });
        }
    }
    Ok(columns)
}

/// A cached periodic light curve: one spline per band over the phase axis
/// plus the period inferred from the table's time span.
#[derive(Debug)]
pub struct PeriodicCurve {
    pub splines: PerBand<CubicSpline>,
    pub period: f64,
}

impl PeriodicCurve {
    /// Load a 7-column table. When `time_in_days` the time axis is
    /// divided by the inferred period so the splines live on [0, 1); a
    /// table that is already phase-normalized is used as is. The inferred
    /// period extends the last sample by one spacing so a uniformly
    /// sampled cycle closes.
    pub fn load(path: &Path, time_in_days: bool) -> Result<Arc<Self>, VarError> {
        let mut columns = load_columns(path, 1 + Band::COUNT)?;
        let time = &columns[0];
        let period = time[time.len() - 1] + (time[1] - time[0]);
        if time_in_days {
            for t in columns[0].iter_mut() {
                *t /= period;
            }
        }
        let time = columns[0].clone();
        let splines = PerBand::from_fn(|band| {
            CubicSpline::new(time.clone(), columns[1 + band.index()].clone())
        });
        Ok(Arc::new(PeriodicCurve { splines, period }))
    }
}

/// A tabulated lensing magnification curve, time in days.
#[derive(Debug)]
pub struct MagnificationCurve {
    pub spline: CubicSpline,
}

impl MagnificationCurve {
    /// Load a 2-column (time in years, magnification) table; time is
    /// rescaled to days at load.
    pub fn load(path: &Path) -> Result<Arc<Self>, VarError> {
        let columns = load_columns(path, 2)?;
        let time_days: Vec<f64> = columns[0].iter().map(|t| t * 365.0).collect();
        Ok(Arc::new(MagnificationCurve {
            spline: CubicSpline::new(time_days, columns[1].clone()),
        }))
    }
}

/// A flare template: per-band delta-flux against time in days, rescaled
/// to each object's distance at evaluation. Evaluated with linear
/// interpolation and wrapped modulo its span, so no spline is built.
#[derive(Debug)]
pub struct FlareTemplate {
    pub time: Vec<f64>,
    pub dflux: PerBand<Vec<f64>>,
}

impl FlareTemplate {
    pub fn load(path: &Path) -> Result<Arc<Self>, VarError> {
        let columns = load_columns(path, 1 + Band::COUNT)?;
        let time = columns[0].clone();
        let dflux = PerBand::from_fn(|band| columns[1 + band.index()].clone());
        Ok(Arc::new(FlareTemplate { time, dflux }))
    }

    pub fn t_min(&self) -> f64 {
        self.time[0]
    }

    pub fn t_max(&self) -> f64 {
        self.time[self.time.len() - 1]
    }
}

/// Piecewise-linear interpolation over sorted samples, clamped at the
/// ends.
pub fn interp_linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }
    let mut left = 0;
    let mut right = last;
    while left < right - 1 {
        let mid = (left + right) / 2;
        if x < xs[mid] {
            right = mid;
        } else {
            left = mid;
        }
    }
    let frac = (x - xs[left]) / (xs[left + 1] - xs[left]);
    ys[left] + frac * (ys[left + 1] - ys[left])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_table(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn load_columns_skips_comments_and_blanks() {
        let dir = TempDir::new().unwrap();
        let path = write_table(
            &dir,
            "t.txt",
            "# header\n0.0 1.0\n\n0.5 2.0\n# trailing\n1.0 3.0\n",
        );
        let cols = load_columns(&path, 2).unwrap();
        assert_eq!(cols[0], vec![0.0, 0.5, 1.0]);
        assert_eq!(cols[1], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn load_columns_rejects_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, "bad.txt", "0.0 1.0\n0.5 2.0 9.0\n");
        match load_columns(&path, 2) {
            Err(VarError::LightCurve { reason, .. }) => {
                assert!(reason.contains("expected 2 columns"))
            }
            other => panic!("expected column error, got {other:?}"),
        }
    }

    #[test]
    fn load_columns_rejects_unsorted_time() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, "bad.txt", "0.0 1.0\n0.5 2.0\n0.4 3.0\n");
        assert!(matches!(
            load_columns(&path, 2),
            Err(VarError::LightCurve { .. })
        ));
    }

    #[test]
    fn periodic_curve_infers_period_and_normalizes() {
        let dir = TempDir::new().unwrap();
        // 4 samples spaced 0.5 days; inferred period = 1.5 + 0.5 = 2.0.
        let mut body = String::new();
        for i in 0..4 {
            let t = i as f64 * 0.5;
            body.push_str(&format!("{t} 1 2 3 4 5 6\n"));
        }
        let path = write_table(&dir, "lc.txt", &body);
        let curve = PeriodicCurve::load(&path, true).unwrap();
        assert_eq!(curve.period, 2.0);
        // Normalized axis spans [0, 0.75].
        assert_eq!(curve.splines[photom::Band::U].x_max(), 0.75);
    }

    #[test]
    fn magnification_curve_rescales_years() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, "bh.txt", "0.0 1.0\n1.0 2.0\n2.0 1.5\n");
        let curve = MagnificationCurve::load(&path).unwrap();
        assert_eq!(curve.spline.x_max(), 730.0);
        assert!((curve.spline.evaluate(365.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn linear_interp_matches_hand_values() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [10.0, 20.0, 0.0];
        assert_eq!(interp_linear(&xs, &ys, 0.5), 15.0);
        assert_eq!(interp_linear(&xs, &ys, 2.0), 10.0);
        assert_eq!(interp_linear(&xs, &ys, -5.0), 10.0);
        assert_eq!(interp_linear(&xs, &ys, 9.0), 0.0);
    }
}
