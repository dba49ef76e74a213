//! Natural cubic spline interpolation for tabulated light curves.

/// A natural cubic spline through a set of samples.
///
/// Piecewise cubic with C2 continuity and zero second derivative at the
/// endpoints. Construction solves the tridiagonal second-derivative
/// system in O(n); evaluation binary-searches for the segment. Outside
/// the sampled range the boundary value is returned rather than
/// extrapolating, which is what periodic and tabulated-magnification
/// evaluation want.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    // Per-segment [a, b, c, d] in a + b dx + c dx^2 + d dx^3.
    coeffs: Vec<[f64; 4]>,
}

impl CubicSpline {
    /// Build a spline over strictly increasing `x`.
    ///
    /// # Panics
    /// If the vectors differ in length, fewer than 2 points are given, or
    /// `x` is not strictly increasing. Callers validate tables on load,
    /// so hitting these is a bug.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "sample vectors must have equal length");
        assert!(x.len() >= 2, "need at least 2 samples to interpolate");
        for i in 1..x.len() {
            assert!(x[i] > x[i - 1], "sample positions must strictly increase");
        }

        let n = x.len();
        let mut h = vec![0.0; n - 1];
        for i in 0..n - 1 {
            h[i] = x[i + 1] - x[i];
        }

        let mut alpha = vec![0.0; n - 1];
        for i in 1..n - 1 {
            alpha[i] =
                (3.0 / h[i]) * (y[i + 1] - y[i]) - (3.0 / h[i - 1]) * (y[i] - y[i - 1]);
        }

        // Thomas algorithm for the second-derivative system.
        let mut l = vec![1.0; n];
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];
        for i in 1..n - 1 {
            l[i] = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        let mut c = vec![0.0; n];
        let mut b = vec![0.0; n - 1];
        let mut d = vec![0.0; n - 1];
        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (y[j + 1] - y[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
        }

        let coeffs = (0..n - 1).map(|i| [y[i], b[i], c[i], d[i]]).collect();
        Self { x, y, coeffs }
    }

    /// Interpolated value at `x`, clamped to the boundary values outside
    /// the sampled range.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x <= self.x[0] {
            return self.y[0];
        }
        let last = self.x.len() - 1;
        if x >= self.x[last] {
            return self.y[last];
        }

        let mut left = 0;
        let mut right = last;
        while left < right - 1 {
            let mid = (left + right) / 2;
            if x < self.x[mid] {
                right = mid;
            } else {
                left = mid;
            }
        }

        let dx = x - self.x[left];
        let [a, b, c, d] = self.coeffs[left];
        a + b * dx + c * dx * dx + d * dx * dx * dx
    }

    /// First sampled position.
    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    /// Last sampled position.
    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }
}
