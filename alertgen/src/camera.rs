//! Detector-plane projection for the mosaic survey camera.
//!
//! Gnomonic (tangent plane) projection from the celestial sphere to the
//! focal plane, then a lookup of which raft and sensor, if any, the
//! projected point lands on. The camera frame is right-handed with z
//! along the boresight and y toward celestial north, so the projection
//! is exact for any pointing away from the poles and sub-pixel accurate
//! across the few-degree field.

use nalgebra::{Matrix3, Vector3};
use skymesh::{Equatorial, ARCSEC_PER_RADIAN};

/// Where a source lands: the sensor and the pixel position on it.
pub trait DetectorProjector: Sync {
    /// Project `target` for an exposure pointed at `pointing`; `None`
    /// when the source misses every sensor.
    fn locate(&self, pointing: &Equatorial, target: &Equatorial) -> Option<DetectorHit>;
}

/// A raft/sensor address on the focal plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorId {
    pub raft_x: u8,
    pub raft_y: u8,
    pub sensor_x: u8,
    pub sensor_y: u8,
}

impl DetectorId {
    /// Compact integer form, the four address digits in order. R:2,2
    /// S:1,1 becomes 2211.
    pub fn number(&self) -> i64 {
        i64::from(self.raft_x) * 1000
            + i64::from(self.raft_y) * 100
            + i64::from(self.sensor_x) * 10
            + i64::from(self.sensor_y)
    }
}

impl std::fmt::Display for DetectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "R:{},{} S:{},{}",
            self.raft_x, self.raft_y, self.sensor_x, self.sensor_y
        )
    }
}

/// One projected source position.
#[derive(Debug, Clone, Copy)]
pub struct DetectorHit {
    /// Pixel column on the sensor, fractional.
    pub x_pix: f64,
    /// Pixel row on the sensor, fractional.
    pub y_pix: f64,
    pub chip: DetectorId,
}

/// Square mosaic of rafts with the four corner rafts unpopulated, each
/// raft a square grid of identical sensors.
#[derive(Debug, Clone)]
pub struct MosaicCamera {
    rafts_across: usize,
    sensors_per_raft: usize,
    sensor_pixels: usize,
    pixel_scale_rad: f64,
}

impl Default for MosaicCamera {
    /// The survey camera: 5x5 rafts minus corners, 3x3 sensors of
    /// 4000 px at 0.2 arcsec per pixel, a 3.3 degree square field.
    fn default() -> Self {
        MosaicCamera {
            rafts_across: 5,
            sensors_per_raft: 3,
            sensor_pixels: 4000,
            pixel_scale_rad: 0.2 / ARCSEC_PER_RADIAN,
        }
    }
}

impl MosaicCamera {
    pub fn new(
        rafts_across: usize,
        sensors_per_raft: usize,
        sensor_pixels: usize,
        pixel_scale_arcsec: f64,
    ) -> Self {
        MosaicCamera {
            rafts_across,
            sensors_per_raft,
            sensor_pixels,
            pixel_scale_rad: pixel_scale_arcsec / ARCSEC_PER_RADIAN,
        }
    }

    /// Focal-plane width in pixels.
    fn width_pixels(&self) -> usize {
        self.rafts_across * self.sensors_per_raft * self.sensor_pixels
    }

    /// Camera basis for a pointing: columns are east, north-aligned, and
    /// boresight directions.
    fn orientation(pointing: &Equatorial) -> Matrix3<f64> {
        let z = pointing.to_cartesian();
        let north = Vector3::new(0.0, 0.0, 1.0);
        let east = north.cross(&z).normalize();
        let y = z.cross(&east).normalize();
        let x = y.cross(&z).normalize();
        Matrix3::from_columns(&[x, y, z])
    }
}

impl DetectorProjector for MosaicCamera {
    fn locate(&self, pointing: &Equatorial, target: &Equatorial) -> Option<DetectorHit> {
        let camera = Self::orientation(pointing).transpose() * target.to_cartesian();
        // Behind the tangent plane; cannot project.
        if camera.z <= 0.0 {
            return None;
        }
        let xi = camera.x / camera.z;
        let eta = camera.y / camera.z;

        let half = self.width_pixels() as f64 / 2.0;
        let u = half + xi / self.pixel_scale_rad;
        let v = half - eta / self.pixel_scale_rad;
        let width = self.width_pixels() as f64;
        if !(0.0..width).contains(&u) || !(0.0..width).contains(&v) {
            return None;
        }

        let raft_pixels = (self.sensors_per_raft * self.sensor_pixels) as f64;
        let raft_x = (u / raft_pixels) as usize;
        let raft_y = (v / raft_pixels) as usize;
        let last = self.rafts_across - 1;
        if (raft_x == 0 || raft_x == last) && (raft_y == 0 || raft_y == last) {
            return None;
        }

        let in_raft_x = u - raft_x as f64 * raft_pixels;
        let in_raft_y = v - raft_y as f64 * raft_pixels;
        let sensor_x = (in_raft_x / self.sensor_pixels as f64) as usize;
        let sensor_y = (in_raft_y / self.sensor_pixels as f64) as usize;

        Some(DetectorHit {
            x_pix: in_raft_x - sensor_x as f64 * self.sensor_pixels as f64,
            y_pix: in_raft_y - sensor_y as f64 * self.sensor_pixels as f64,
            chip: DetectorId {
                raft_x: raft_x as u8,
                raft_y: raft_y as u8,
                sensor_x: sensor_x as u8,
                sensor_y: sensor_y as u8,
            },
        })
    }
}
