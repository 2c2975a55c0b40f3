//! Globe projection: geographic coordinates to render-space points.
//!
//! The globe is a sphere of `base_radius` centered at the origin, Y up.
//! Longitude 0 on the equator maps to +X, the north pole to +Y.

use super::Vec3;
use super::precision::wrap_symmetric;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Projection parameters: render-space radius of the globe and the scale
/// applied to altitudes (render units per kilometer).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlobeProjection {
    pub base_radius: f64,
    pub altitude_scale: f64,
}

impl Default for GlobeProjection {
    fn default() -> Self {
        Self {
            base_radius: 1.0,
            altitude_scale: 1.0 / EARTH_RADIUS_KM,
        }
    }
}

impl GlobeProjection {
    pub fn new(base_radius: f64, altitude_scale: f64) -> Self {
        Self {
            base_radius,
            altitude_scale,
        }
    }

    /// Project `(lat, lng, altitude_km)` to a point on or above the globe.
    ///
    /// Never fails: latitude is clamped to `[-90, 90]`, longitude wrapped into
    /// `[-180, 180)`, negative altitude treated as zero and non-finite inputs
    /// as zero.
    pub fn project(&self, lat_deg: f64, lng_deg: f64, altitude_km: f64) -> Vec3 {
        let lat = finite_or_zero(lat_deg).clamp(-90.0, 90.0);
        let lng = wrap_symmetric(finite_or_zero(lng_deg), 180.0);

        let r = self.radius_at(altitude_km);
        let phi = (90.0 - lat).to_radians();
        let theta = (lng + 180.0).to_radians();

        Vec3::new(
            -r * phi.sin() * theta.cos(),
            r * phi.cos(),
            r * phi.sin() * theta.sin(),
        )
    }

    /// Inverse of [`GlobeProjection::project`]: `(lat, lng, altitude_km)`.
    ///
    /// The origin maps to `(0, 0, -base_radius / altitude_scale)`.
    pub fn unproject(&self, point: Vec3) -> (f64, f64, f64) {
        let r = point.length();
        if r <= 0.0 {
            return (0.0, 0.0, -self.base_radius / self.altitude_scale);
        }
        let lat = 90.0 - (point.y / r).clamp(-1.0, 1.0).acos().to_degrees();
        let theta = point.z.atan2(-point.x).to_degrees();
        let lng = wrap_symmetric(theta - 180.0, 180.0);
        let alt = (r - self.base_radius) / self.altitude_scale;
        (lat, lng, alt)
    }

    /// Render-space radius of a shell at `altitude_km`.
    pub fn radius_at(&self, altitude_km: f64) -> f64 {
        self.base_radius + finite_or_zero(altitude_km).max(0.0) * self.altitude_scale
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
