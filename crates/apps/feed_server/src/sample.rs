//! Demo constellation served when no upstream feed is configured or the
//! upstream is unavailable.
//!
//! Objects sit on a fixed lat/lng grid at `elapsed = 0` and drift eastward
//! one full turn per `drift_period_secs`, so a client sees motion between
//! polls. This is display data, not orbital propagation.

use foundation::math::precision::wrap_symmetric;
use tracking::snapshot::{PositionRecord, SnapshotEnvelope, TrackedObject};

pub const SAMPLE_DATA_SOURCE: &str = "sample_data";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleConstellation {
    pub count: usize,
    pub altitude_km: f64,
    pub velocity_kmh: f64,
    pub drift_period_secs: f64,
}

impl Default for SampleConstellation {
    fn default() -> Self {
        Self {
            count: 10,
            altitude_km: 550.0,
            velocity_kmh: 27_000.0,
            drift_period_secs: 5_760.0,
        }
    }
}

impl SampleConstellation {
    pub fn objects_at(&self, elapsed_secs: f64) -> Vec<TrackedObject> {
        let drift_deg = if self.drift_period_secs > 0.0 && elapsed_secs.is_finite() {
            360.0 * (elapsed_secs / self.drift_period_secs).fract()
        } else {
            0.0
        };
        (0..self.count)
            .map(|i| {
                let row = (i % 10) as f64;
                let band = (i / 10) as f64;
                let lat = -60.0 + 15.0 * row;
                let lng = wrap_symmetric(-180.0 + 36.0 * row + 7.2 * band + drift_deg, 180.0);
                TrackedObject::new(
                    50_000 + i as u64,
                    format!("STARLINK-{}", 1_000 + i),
                    lat,
                    lng,
                    self.altitude_km,
                )
                .with_velocity(self.velocity_kmh)
            })
            .collect()
    }

    pub fn envelope_at(&self, elapsed_secs: f64, timestamp: String, note: &str) -> SnapshotEnvelope {
        let positions: Vec<PositionRecord> = self
            .objects_at(elapsed_secs)
            .iter()
            .map(|object| PositionRecord::from_object(object, Some(timestamp.clone())))
            .collect();
        SnapshotEnvelope {
            timestamp,
            satellite_count: positions.len(),
            positions_calculated: positions.len(),
            positions,
            data_source: SAMPLE_DATA_SOURCE.to_string(),
            tle_age_hours: 0.0,
            note: Some(note.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SampleConstellation;
    use pretty_assertions::assert_eq;

    #[test]
    fn starts_on_the_grid() {
        let objects = SampleConstellation::default().objects_at(0.0);
        assert_eq!(objects.len(), 10);
        assert_eq!(objects[0].name, "STARLINK-1000");
        assert_eq!(objects[0].id.get(), 50_000);
        assert_eq!((objects[0].lat, objects[0].lng), (-60.0, -180.0));
        assert_eq!((objects[9].lat, objects[9].lng), (75.0, 144.0));
        assert!(objects.iter().all(|o| o.validate().is_ok()));
    }

    #[test]
    fn drifts_east_over_time() {
        let sample = SampleConstellation::default();
        let quarter = sample.objects_at(sample.drift_period_secs / 4.0);
        assert!((quarter[0].lng - -90.0).abs() < 1e-9);
        assert_eq!(quarter[0].lat, -60.0);

        let full = sample.objects_at(sample.drift_period_secs);
        assert!((full[3].lng - sample.objects_at(0.0)[3].lng).abs() < 1e-9);
    }

    #[test]
    fn envelope_counts_positions() {
        let sample = SampleConstellation {
            count: 25,
            ..SampleConstellation::default()
        };
        let envelope = sample.envelope_at(0.0, "t".to_string(), "demo");
        assert_eq!(envelope.satellite_count, 25);
        assert_eq!(envelope.positions[24].norad_id, 50_024);
        assert_eq!(envelope.data_source, "sample_data");
    }
}
