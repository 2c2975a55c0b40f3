use std::f64::consts::PI;
use std::fmt;
use std::fs;
use std::path::Path;

use foundation::math::GlobeProjection;
use scene::camera::CameraSettings;
use scene::picking::PickOptions;
use serde::{Deserialize, Serialize};

use crate::interpolate::InterpolationSettings;

/// What happens to an object that a new snapshot no longer mentions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StalePolicy {
    /// Remove the entry and its markers immediately.
    #[default]
    Purge,
    /// Keep the entry frozen at its last target, flagged stale.
    Retain,
    /// Retain until unseen for longer than `seconds`, then purge.
    Grace { seconds: f64 },
}

/// Every tunable of the tracker. Each field has a default, so an empty
/// JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackingConfig {
    pub base_radius: f64,
    /// Render units per kilometer of altitude.
    pub altitude_scale: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Per-second convergence rate of interpolation.
    pub damping_rate: f64,
    /// Extra multiplier on each interpolation step, in `[0, 1]`.
    pub smoothing: f64,
    pub auto_orbit_speed: f64,
    pub stale_policy: StalePolicy,
    pub drag_sensitivity: f64,
    pub zoom_sensitivity: f64,
    pub polar_epsilon: f64,
    pub default_radius: f64,
    /// Hit radius around each marker, in render units.
    pub pick_radius: f64,
    /// Add a decorative halo marker around each object.
    pub halo: bool,
    pub snap_epsilon: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        let camera = CameraSettings::default();
        let projection = GlobeProjection::default();
        let interpolation = InterpolationSettings::default();
        Self {
            base_radius: projection.base_radius,
            altitude_scale: projection.altitude_scale,
            min_radius: camera.min_radius,
            max_radius: camera.max_radius,
            damping_rate: interpolation.damping_rate,
            smoothing: interpolation.smoothing,
            auto_orbit_speed: camera.auto_orbit_speed,
            stale_policy: StalePolicy::default(),
            drag_sensitivity: camera.drag_sensitivity,
            zoom_sensitivity: camera.zoom_sensitivity,
            polar_epsilon: camera.polar_epsilon,
            default_radius: camera.default_radius,
            pick_radius: PickOptions::default().marker_radius,
            halo: true,
            snap_epsilon: interpolation.snap_epsilon,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "I/O error: {err}"),
            ConfigError::Parse(err) => write!(f, "Config parse error: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
        }
    }
}

impl TrackingConfig {
    /// Parses and sanitizes a JSON config.
    pub fn from_json(payload: &str) -> Result<Self, ConfigError> {
        let config: TrackingConfig = serde_json::from_str(payload).map_err(ConfigError::Parse)?;
        Ok(config.sanitized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let payload = fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json(&payload)
    }

    /// Returns a copy with every field forced into its valid range.
    ///
    /// Non-finite values fall back to defaults; a reversed zoom range is
    /// swapped; the zoom floor never lets the eye enter the globe.
    pub fn sanitized(&self) -> Self {
        let d = TrackingConfig::default();
        let positive = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        let non_negative = |v: f64, fallback: f64| if v.is_finite() { v.max(0.0) } else { fallback };

        let base_radius = positive(self.base_radius, d.base_radius);
        let mut min_radius = positive(self.min_radius, d.min_radius);
        let mut max_radius = positive(self.max_radius, d.max_radius);
        if min_radius > max_radius {
            std::mem::swap(&mut min_radius, &mut max_radius);
        }
        min_radius = min_radius.max(base_radius * 1.01);
        max_radius = max_radius.max(min_radius);

        let default_radius = if self.default_radius.is_finite() {
            self.default_radius.clamp(min_radius, max_radius)
        } else {
            d.default_radius.clamp(min_radius, max_radius)
        };

        let stale_policy = match self.stale_policy {
            StalePolicy::Grace { seconds } => StalePolicy::Grace {
                seconds: non_negative(seconds, 0.0),
            },
            other => other,
        };

        Self {
            base_radius,
            altitude_scale: non_negative(self.altitude_scale, d.altitude_scale),
            min_radius,
            max_radius,
            damping_rate: non_negative(self.damping_rate, d.damping_rate),
            smoothing: if self.smoothing.is_finite() {
                self.smoothing.clamp(0.0, 1.0)
            } else {
                d.smoothing
            },
            auto_orbit_speed: if self.auto_orbit_speed.is_finite() {
                self.auto_orbit_speed
            } else {
                d.auto_orbit_speed
            },
            stale_policy,
            drag_sensitivity: if self.drag_sensitivity.is_finite() {
                self.drag_sensitivity
            } else {
                d.drag_sensitivity
            },
            zoom_sensitivity: if self.zoom_sensitivity.is_finite() {
                self.zoom_sensitivity
            } else {
                d.zoom_sensitivity
            },
            polar_epsilon: positive(self.polar_epsilon, d.polar_epsilon).min(PI / 4.0),
            default_radius,
            pick_radius: positive(self.pick_radius, d.pick_radius),
            halo: self.halo,
            snap_epsilon: non_negative(self.snap_epsilon, d.snap_epsilon),
        }
    }

    pub fn projection(&self) -> GlobeProjection {
        GlobeProjection::new(self.base_radius, self.altitude_scale)
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            min_radius: self.min_radius,
            max_radius: self.max_radius,
            default_radius: self.default_radius,
            polar_epsilon: self.polar_epsilon,
            drag_sensitivity: self.drag_sensitivity,
            zoom_sensitivity: self.zoom_sensitivity,
            auto_orbit_speed: self.auto_orbit_speed,
        }
    }

    pub fn interpolation(&self) -> InterpolationSettings {
        InterpolationSettings {
            damping_rate: self.damping_rate,
            smoothing: self.smoothing,
            snap_epsilon: self.snap_epsilon,
        }
    }

    pub fn pick_options(&self) -> PickOptions {
        PickOptions {
            marker_radius: self.pick_radius,
            occluder_radius: Some(self.base_radius),
            ..PickOptions::default()
        }
    }
}
