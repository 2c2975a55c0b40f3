use foundation::math::precision::stable_total_cmp_f64;
use foundation::math::{Geodetic, look_angles};
use serde::{Deserialize, Serialize};
use tracking::snapshot::TrackedObject;

pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 10.0;

/// Query string of `/api/satellites/visible`. Missing values default to
/// an observer at (0, 0) and a 10 degree mask.
#[derive(Debug, Default, Deserialize)]
pub struct VisibleParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub elevation: Option<f64>,
}

impl VisibleParams {
    /// Observer and elevation mask, or `None` if the coordinates are unusable.
    pub fn resolve(&self) -> Option<(Geodetic, f64)> {
        let lat = self.lat.unwrap_or(0.0);
        let lon = self.lon.unwrap_or(0.0);
        let elevation = self.elevation.unwrap_or(DEFAULT_MIN_ELEVATION_DEG);
        if !(lat.is_finite() && lon.is_finite() && elevation.is_finite()) {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some((Geodetic::new(lat, lon, 0.0), elevation.clamp(-90.0, 90.0)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleSatellite {
    pub name: String,
    pub norad_id: u64,
    pub elevation_degrees: f64,
    pub azimuth_degrees: f64,
    pub distance_km: f64,
    pub lat: f64,
    pub lng: f64,
    pub altitude_km: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObserverLocation {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisibleResponse {
    pub observer_location: ObserverLocation,
    pub min_elevation_degrees: f64,
    pub visible_count: usize,
    pub satellites: Vec<VisibleSatellite>,
    pub timestamp: String,
}

/// Objects at or above `min_elevation_deg` from `observer`, highest first.
/// Equal elevations order by catalog number.
pub fn visible_from(
    observer: Geodetic,
    min_elevation_deg: f64,
    objects: &[TrackedObject],
) -> Vec<VisibleSatellite> {
    let mut visible: Vec<VisibleSatellite> = objects
        .iter()
        .filter_map(|object| {
            let target = Geodetic::new(object.lat, object.lng, object.altitude_km);
            let angles = look_angles(observer, target);
            (angles.elevation_deg >= min_elevation_deg).then(|| VisibleSatellite {
                name: object.name.clone(),
                norad_id: object.id.get(),
                elevation_degrees: angles.elevation_deg,
                azimuth_degrees: angles.azimuth_deg,
                distance_km: angles.range_km,
                lat: object.lat,
                lng: object.lng,
                altitude_km: object.altitude_km,
            })
        })
        .collect();

    visible.sort_by(|a, b| {
        stable_total_cmp_f64(b.elevation_degrees, a.elevation_degrees)
            .then_with(|| a.norad_id.cmp(&b.norad_id))
    });
    visible
}
