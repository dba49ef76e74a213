//! Equatorial coordinates and unit-vector helpers.

use nalgebra::Vector3;

/// Arcseconds per radian.
pub const ARCSEC_PER_RADIAN: f64 = 206_264.806_247_096_36;

/// A direction on the celestial sphere in equatorial coordinates.
///
/// Both angles are stored in radians; right ascension increases eastward,
/// declination is positive toward the north celestial pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equatorial {
    /// Right ascension in radians.
    pub ra: f64,
    /// Declination in radians.
    pub dec: f64,
}

impl Equatorial {
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }

    pub fn from_degrees(ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            ra: ra_deg.to_radians(),
            dec: dec_deg.to_radians(),
        }
    }

    pub fn ra_degrees(&self) -> f64 {
        self.ra.to_degrees()
    }

    pub fn dec_degrees(&self) -> f64 {
        self.dec.to_degrees()
    }

    /// Unit vector in the frame where +z is the north celestial pole and
    /// +x points at (ra, dec) = (0, 0).
    pub fn to_cartesian(&self) -> Vector3<f64> {
        let cos_dec = self.dec.cos();
        Vector3::new(
            cos_dec * self.ra.cos(),
            cos_dec * self.ra.sin(),
            self.dec.sin(),
        )
    }

    /// Inverse of [`Equatorial::to_cartesian`]; the input need not be
    /// normalized.
    pub fn from_cartesian(v: &Vector3<f64>) -> Self {
        let unit = v.normalize();
        let ra = unit.y.atan2(unit.x).rem_euclid(std::f64::consts::TAU);
        let dec = unit.z.clamp(-1.0, 1.0).asin();
        Self { ra, dec }
    }

    /// Angular separation from `other` in radians, by the haversine form,
    /// which stays accurate for small separations.
    pub fn separation(&self, other: &Equatorial) -> f64 {
        let delta_ra = other.ra - self.ra;
        let delta_dec = other.dec - self.dec;
        let a = (delta_dec / 2.0).sin().powi(2)
            + self.dec.cos() * other.dec.cos() * (delta_ra / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }
}
