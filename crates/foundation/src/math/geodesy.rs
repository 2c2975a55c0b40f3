//! Spherical-Earth geodesy for observer look angles.
//!
//! Positions arriving in snapshots are already sub-satellite points, so a
//! spherical Earth of [`EARTH_RADIUS_KM`] is accurate enough for "is it above
//! my horizon" queries.

use super::{EARTH_RADIUS_KM, Vec3};

/// Geographic position in degrees and kilometers above the mean sphere.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Geodetic {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_km: f64,
}

impl Geodetic {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_km: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            alt_km,
        }
    }
}

/// Local East-North-Up offset (kilometers).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Enu {
    pub east: f64,
    pub north: f64,
    pub up: f64,
}

/// Azimuth (clockwise from north), elevation above the local horizon and
/// slant range from an observer to a target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

/// Earth-centered, Earth-fixed position (kilometers), Z through the north pole.
pub fn geodetic_to_ecef_km(geo: Geodetic) -> Vec3 {
    let lat = geo.lat_deg.to_radians();
    let lon = geo.lon_deg.to_radians();
    let r = EARTH_RADIUS_KM + geo.alt_km;
    Vec3::new(
        r * lat.cos() * lon.cos(),
        r * lat.cos() * lon.sin(),
        r * lat.sin(),
    )
}

pub fn ecef_to_enu(delta: Vec3, origin: Geodetic) -> Enu {
    let sin_lat = origin.lat_deg.to_radians().sin();
    let cos_lat = origin.lat_deg.to_radians().cos();
    let sin_lon = origin.lon_deg.to_radians().sin();
    let cos_lon = origin.lon_deg.to_radians().cos();

    let east = -sin_lon * delta.x + cos_lon * delta.y;
    let north = -sin_lat * cos_lon * delta.x - sin_lat * sin_lon * delta.y + cos_lat * delta.z;
    let up = cos_lat * cos_lon * delta.x + cos_lat * sin_lon * delta.y + sin_lat * delta.z;

    Enu { east, north, up }
}

pub fn look_angles(observer: Geodetic, target: Geodetic) -> LookAngles {
    let delta = geodetic_to_ecef_km(target) - geodetic_to_ecef_km(observer);
    let range_km = delta.length();
    if range_km <= 0.0 {
        return LookAngles {
            azimuth_deg: 0.0,
            elevation_deg: 90.0,
            range_km: 0.0,
        };
    }

    let enu = ecef_to_enu(delta, observer);
    let azimuth_deg = enu.east.atan2(enu.north).to_degrees().rem_euclid(360.0);
    let elevation_deg = (enu.up / range_km).clamp(-1.0, 1.0).asin().to_degrees();

    LookAngles {
        azimuth_deg,
        elevation_deg,
        range_km,
    }
}

#[cfg(test)]
mod tests {
    use super::{Geodetic, geodetic_to_ecef_km, look_angles};
    use crate::math::EARTH_RADIUS_KM;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn ecef_equator_prime_meridian() {
        let p = geodetic_to_ecef_km(Geodetic::new(0.0, 0.0, 0.0));
        assert_close(p.x, EARTH_RADIUS_KM, 1e-9);
        assert_close(p.y, 0.0, 1e-9);
        assert_close(p.z, 0.0, 1e-9);
    }

    #[test]
    fn overhead_target_is_at_zenith() {
        let observer = Geodetic::new(47.0, 8.0, 0.0);
        let look = look_angles(observer, Geodetic::new(47.0, 8.0, 550.0));
        assert_close(look.elevation_deg, 90.0, 1e-6);
        assert_close(look.range_km, 550.0, 1e-6);
    }

    #[test]
    fn azimuth_points_toward_target() {
        let observer = Geodetic::new(0.0, 0.0, 0.0);
        let north = look_angles(observer, Geodetic::new(5.0, 0.0, 550.0));
        assert_close(north.azimuth_deg, 0.0, 1e-6);
        let east = look_angles(observer, Geodetic::new(0.0, 5.0, 550.0));
        assert_close(east.azimuth_deg, 90.0, 1e-6);
        assert!(east.elevation_deg > 0.0);
    }

    #[test]
    fn antipodal_target_is_below_horizon() {
        let look = look_angles(
            Geodetic::new(0.0, 0.0, 0.0),
            Geodetic::new(0.0, 180.0, 550.0),
        );
        assert!(look.elevation_deg < 0.0);
    }
}
