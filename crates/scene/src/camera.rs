//! Orbit camera around the globe and the input state machine that drives it.
//!
//! The camera always looks at the globe center. Its pose is a spherical
//! coordinate `(radius, polar, azimuth)`:
//! - `polar` is measured from +Y (north) and is kept away from both poles so
//!   the view basis never degenerates,
//! - `azimuth` rotates around +Y, `0` puts the eye on +Z,
//! - `radius` is clamped to the configured zoom range.
//!
//! Input arrives as normalized pointer positions, wheel deltas and pinch
//! spans; the controller has no knowledge of any windowing library.

use std::f64::consts::PI;

use foundation::math::precision::wrap_symmetric;
use foundation::math::{Vec2, Vec3};
use tracing::trace;

use crate::picking::Ray;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraSettings {
    pub min_radius: f64,
    pub max_radius: f64,
    /// Radius of the canonical pose restored by `reset_view`.
    pub default_radius: f64,
    /// Minimum angular distance (radians) between the eye and either pole.
    pub polar_epsilon: f64,
    /// Radians of rotation per unit of normalized pointer travel.
    pub drag_sensitivity: f64,
    /// Exponent scale for wheel zoom: `radius *= exp(delta * zoom_sensitivity)`.
    pub zoom_sensitivity: f64,
    /// Radians of azimuth added per frame while auto-orbiting.
    pub auto_orbit_speed: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            min_radius: 1.2,
            max_radius: 10.0,
            default_radius: 3.0,
            polar_epsilon: 0.01,
            drag_sensitivity: PI,
            zoom_sensitivity: 0.002,
            auto_orbit_speed: 0.002,
        }
    }
}

impl CameraSettings {
    fn clamp_radius(&self, radius: f64) -> f64 {
        if radius.is_nan() {
            return self.default_radius.clamp(self.min_radius, self.max_radius);
        }
        radius.clamp(self.min_radius, self.max_radius)
    }

    fn clamp_polar(&self, polar: f64) -> f64 {
        let eps = self.polar_epsilon.clamp(1e-6, PI / 2.0 - 1e-6);
        if !polar.is_finite() {
            return PI / 2.0;
        }
        polar.clamp(eps, PI - eps)
    }
}

/// Spherical camera pose relative to the globe center.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub radius: f64,
    pub polar: f64,
    pub azimuth: f64,
    pub auto_orbit_enabled: bool,
}

impl CameraState {
    /// Eye position in world space.
    pub fn eye(&self) -> Vec3 {
        let s = self.polar.sin();
        Vec3::new(
            self.radius * s * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * s * self.azimuth.cos(),
        )
    }

    /// Orthonormal view basis `(forward, right, up)`, looking at the origin.
    pub fn basis(&self) -> Option<(Vec3, Vec3, Vec3)> {
        let forward = (-self.eye()).normalize()?;
        let right = forward.cross(Vec3::Y).normalize()?;
        let up = right.cross(forward);
        Some((forward, right, up))
    }
}

/// Perspective parameters needed to turn NDC into rays and back.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lens {
    pub fov_y_rad: f64,
    /// Viewport width / height.
    pub aspect: f64,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            fov_y_rad: 45f64.to_radians(),
            aspect: 16.0 / 9.0,
        }
    }
}

impl Lens {
    pub fn new(fov_y_rad: f64, aspect: f64) -> Self {
        Self { fov_y_rad, aspect }
    }
}

/// World-space ray from the eye through `ndc` (`[-1, 1]`, +Y up).
pub fn ray_from_ndc(camera: &CameraState, lens: Lens, ndc: Vec2) -> Option<Ray> {
    let (forward, right, up) = camera.basis()?;
    let tan_half = (0.5 * lens.fov_y_rad).tan();
    let dir = forward + right * (ndc.x * tan_half * lens.aspect) + up * (ndc.y * tan_half);
    Some(Ray::new(camera.eye(), dir.normalize()?))
}

/// NDC of a world-space point, or `None` if it lies behind the eye.
pub fn project_to_ndc(camera: &CameraState, lens: Lens, point: Vec3) -> Option<Vec2> {
    let (forward, right, up) = camera.basis()?;
    let v = point - camera.eye();
    let depth = v.dot(forward);
    if depth <= 0.0 {
        return None;
    }
    let tan_half = (0.5 * lens.fov_y_rad).tan();
    Some(Vec2::new(
        v.dot(right) / (depth * tan_half * lens.aspect),
        v.dot(up) / (depth * tan_half),
    ))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CameraMode {
    Idle,
    Dragging,
    PinchZooming,
    AutoOrbiting,
}

/// Input state machine over the orbit camera.
///
/// Manual input always wins: any drag, pinch or wheel disables auto-orbit,
/// and it stays disabled until `reset_view` or `set_auto_orbit(true)`.
#[derive(Debug, Clone)]
pub struct CameraController {
    settings: CameraSettings,
    state: CameraState,
    mode: CameraMode,
    last_pointer: Option<Vec2>,
    last_pinch_span: Option<f64>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

impl CameraController {
    /// Starts at the canonical pose, auto-orbiting.
    pub fn new(settings: CameraSettings) -> Self {
        let mut controller = Self {
            settings,
            state: CameraState {
                radius: settings.default_radius,
                polar: PI / 2.0,
                azimuth: 0.0,
                auto_orbit_enabled: true,
            },
            mode: CameraMode::AutoOrbiting,
            last_pointer: None,
            last_pinch_span: None,
        };
        controller.reset_view();
        controller
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn pointer_down(&mut self, pos: Vec2) {
        match self.mode {
            CameraMode::Idle | CameraMode::AutoOrbiting | CameraMode::Dragging => {
                self.state.auto_orbit_enabled = false;
                self.last_pointer = pos.is_finite().then_some(pos);
                self.transition(CameraMode::Dragging);
            }
            // A pinch owns the gesture until it ends.
            CameraMode::PinchZooming => {}
        }
    }

    /// Pointer motion; only rotates while dragging.
    pub fn pointer_move(&mut self, pos: Vec2) {
        if self.mode != CameraMode::Dragging || !pos.is_finite() {
            return;
        }
        let Some(last) = self.last_pointer.replace(pos) else {
            return;
        };
        let delta = pos - last;
        if delta.is_finite() {
            self.rotate(delta);
        }
    }

    pub fn pointer_up(&mut self) {
        if self.mode != CameraMode::Dragging {
            return;
        }
        self.last_pointer = None;
        self.transition(self.resting_mode());
    }

    /// Wheel zoom. Positive deltas zoom out.
    pub fn wheel(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        self.state.auto_orbit_enabled = false;
        self.zoom_by((delta * self.settings.zoom_sensitivity).exp());
        if self.mode == CameraMode::AutoOrbiting {
            self.transition(CameraMode::Idle);
        }
    }

    /// Two-finger gesture began with fingers `span` apart (any unit).
    pub fn pinch_start(&mut self, span: f64) {
        self.state.auto_orbit_enabled = false;
        self.last_pointer = None;
        self.last_pinch_span = (span > 0.0 && span.is_finite()).then_some(span);
        self.transition(CameraMode::PinchZooming);
    }

    /// Spreading the fingers (growing span) zooms in.
    pub fn pinch_move(&mut self, span: f64) {
        if self.mode != CameraMode::PinchZooming || !(span > 0.0 && span.is_finite()) {
            return;
        }
        if let Some(last) = self.last_pinch_span.replace(span) {
            self.zoom_by(last / span);
        }
    }

    pub fn pinch_end(&mut self) {
        if self.mode != CameraMode::PinchZooming {
            return;
        }
        self.last_pinch_span = None;
        self.transition(self.resting_mode());
    }

    /// Back to the canonical pose with auto-orbit re-enabled, from any state.
    pub fn reset_view(&mut self) {
        self.state = CameraState {
            radius: self.settings.clamp_radius(self.settings.default_radius),
            polar: self.settings.clamp_polar(PI / 2.0),
            azimuth: 0.0,
            auto_orbit_enabled: true,
        };
        self.last_pointer = None;
        self.last_pinch_span = None;
        self.transition(CameraMode::AutoOrbiting);
    }

    /// Explicit auto-orbit toggle. Enabling during a gesture takes effect
    /// once the gesture ends.
    pub fn set_auto_orbit(&mut self, enabled: bool) {
        self.state.auto_orbit_enabled = enabled;
        match (self.mode, enabled) {
            (CameraMode::Idle, true) => self.transition(CameraMode::AutoOrbiting),
            (CameraMode::AutoOrbiting, false) => self.transition(CameraMode::Idle),
            _ => {}
        }
    }

    /// Per-frame step. Returns `true` if the camera moved.
    pub fn advance_frame(&mut self) -> bool {
        if self.mode != CameraMode::AutoOrbiting || !self.state.auto_orbit_enabled {
            return false;
        }
        self.state.azimuth = wrap_symmetric(
            self.state.azimuth + self.settings.auto_orbit_speed,
            PI,
        );
        true
    }

    fn rotate(&mut self, delta: Vec2) {
        let s = self.settings.drag_sensitivity;
        // Dragging right turns the globe eastward under the pointer.
        self.state.azimuth = wrap_symmetric(self.state.azimuth - delta.x * s, PI);
        self.state.polar = self.settings.clamp_polar(self.state.polar + delta.y * s);
    }

    fn zoom_by(&mut self, factor: f64) {
        // An overflowed factor still clamps to the zoom range.
        if factor.is_nan() || factor < 0.0 {
            return;
        }
        self.state.radius = self.settings.clamp_radius(self.state.radius * factor);
    }

    fn resting_mode(&self) -> CameraMode {
        if self.state.auto_orbit_enabled {
            CameraMode::AutoOrbiting
        } else {
            CameraMode::Idle
        }
    }

    fn transition(&mut self, to: CameraMode) {
        if self.mode != to {
            trace!(from = ?self.mode, to = ?to, "camera mode");
            self.mode = to;
        }
    }
}
