//! Spherical caps (half-spaces) and their relation to trixels.
//!
//! A half-space is the set of directions within a fixed angle of an axis,
//! stored as the axis plus the cosine of that angle. Classifying a trixel
//! against a half-space is what lets the partitioner decide exactly which
//! mesh cells a telescope pointing touches.

use nalgebra::Vector3;

use crate::coords::Equatorial;
use crate::trixel::Trixel;

/// Relation of a trixel to a half-space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Every corner of the trixel lies inside the cap.
    Full,
    /// The cap and the trixel overlap without full containment.
    Partial,
    /// The cap and the trixel share no point.
    Outside,
}

/// A spherical cap: all directions `p` with `axis . p > cos(radius)`.
#[derive(Debug, Clone, Copy)]
pub struct HalfSpace {
    axis: Vector3<f64>,
    cos_radius: f64,
    radius: f64,
}

impl HalfSpace {
    /// Cap of angular `radius` (radians) around the unit vector `axis`.
    pub fn new(axis: Vector3<f64>, radius: f64) -> Self {
        Self {
            axis: axis.normalize(),
            cos_radius: radius.cos(),
            radius,
        }
    }

    /// Cap of angular `radius` (radians) around an equatorial pointing.
    pub fn from_pointing(center: &Equatorial, radius: f64) -> Self {
        Self::new(center.to_cartesian(), radius)
    }

    pub fn axis(&self) -> &Vector3<f64> {
        &self.axis
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        self.axis.dot(point) > self.cos_radius
    }

    /// Classify `trixel` against the cap.
    ///
    /// Corner counting settles the easy cases. With no corner inside, the
    /// cap can still overlap by sitting wholly within the trixel (axis
    /// containment) or by poking across an edge (boundary-circle versus
    /// edge-arc intersection), so both are checked before ruling `Outside`.
    pub fn classify(&self, trixel: &Trixel) -> Containment {
        let corners = trixel.corners();
        let inside = corners.iter().filter(|c| self.contains(c)).count();
        if inside == 3 {
            return Containment::Full;
        }
        if inside > 0 {
            return Containment::Partial;
        }

        // Bounding-cap separation rules out most distant trixels cheaply.
        let center_sep = self.axis.dot(&trixel.center()).clamp(-1.0, 1.0).acos();
        if center_sep > self.radius + trixel.radius() {
            return Containment::Outside;
        }

        if trixel.contains(&self.axis) {
            return Containment::Partial;
        }

        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            if self.intersects_edge(&corners[i], &corners[j]) {
                return Containment::Partial;
            }
        }
        Containment::Outside
    }

    /// True when the cap's boundary circle crosses the great-circle arc
    /// from `p1` to `p2`. Parametrizing the arc by the chord and requiring
    /// `axis . p(s) = cos(radius)` gives a quadratic in s; a root in [0, 1]
    /// is a crossing.
    fn intersects_edge(&self, p1: &Vector3<f64>, p2: &Vector3<f64>) -> bool {
        let cos_arc = p1.dot(p2);
        let u2 = (1.0 - cos_arc) / (1.0 + cos_arc);
        let gamma1 = self.axis.dot(p1);
        let gamma2 = self.axis.dot(p2);
        let a = -u2 * (gamma1 + self.cos_radius);
        let b = gamma1 * (u2 - 1.0) + gamma2 * (u2 + 1.0);
        let c = gamma1 - self.cos_radius;

        if a.abs() < 1e-15 {
            if b.abs() < 1e-15 {
                return false;
            }
            let s = -c / b;
            return (0.0..=1.0).contains(&s);
        }

        let det = b * b - 4.0 * a * c;
        if det < 0.0 {
            return false;
        }
        let sqrt_det = det.sqrt();
        let s1 = (-b + sqrt_det) / (2.0 * a);
        if (0.0..=1.0).contains(&s1) {
            return true;
        }
        let s2 = (-b - sqrt_det) / (2.0 * a);
        (0.0..=1.0).contains(&s2)
    }
}
