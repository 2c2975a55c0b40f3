//! The rendering capability the tracking core needs from its host.
//!
//! The host owns the real scene graph and the render loop. The core only
//! adds, moves and removes markers and asks for pick rays, so it can be
//! driven and tested without any rendering context.

use std::collections::BTreeMap;

use foundation::ids::ObjectId;
use foundation::math::{Vec2, Vec3};

use crate::camera::{CameraState, Lens, ray_from_ndc};
use crate::picking::Ray;

/// Role of a marker in the scene. Only primary markers are pickable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkerKind {
    Primary,
    /// Decorative glow around a primary marker.
    Halo,
}

pub trait SceneHost {
    fn add_marker(&mut self, id: ObjectId, kind: MarkerKind, position: Vec3);

    fn remove_marker(&mut self, id: ObjectId, kind: MarkerKind);

    fn set_marker_position(&mut self, id: ObjectId, kind: MarkerKind, position: Vec3);

    /// Current viewport lens. Hosts update this on resize.
    fn lens(&self) -> Lens {
        Lens::default()
    }

    /// World-space pick ray through `ndc`.
    fn cast_ray(&self, camera: &CameraState, ndc: Vec2) -> Option<Ray> {
        ray_from_ndc(camera, self.lens(), ndc)
    }

    /// Draw the frame. Called last in every frame, after all marker updates.
    fn present(&mut self, _camera: &CameraState) {}
}

impl<H: SceneHost + ?Sized> SceneHost for &mut H {
    fn add_marker(&mut self, id: ObjectId, kind: MarkerKind, position: Vec3) {
        (**self).add_marker(id, kind, position)
    }

    fn remove_marker(&mut self, id: ObjectId, kind: MarkerKind) {
        (**self).remove_marker(id, kind)
    }

    fn set_marker_position(&mut self, id: ObjectId, kind: MarkerKind, position: Vec3) {
        (**self).set_marker_position(id, kind, position)
    }

    fn lens(&self) -> Lens {
        (**self).lens()
    }

    fn cast_ray(&self, camera: &CameraState, ndc: Vec2) -> Option<Ray> {
        (**self).cast_ray(camera, ndc)
    }

    fn present(&mut self, camera: &CameraState) {
        (**self).present(camera)
    }
}

/// Headless host that keeps marker positions in memory.
///
/// Used by tests and by the headless viewer. Operations on unknown markers
/// are counted rather than ignored so callers can assert they never happen.
#[derive(Debug, Default, Clone)]
pub struct RecordingHost {
    markers: BTreeMap<(ObjectId, MarkerKind), Vec3>,
    lens: Lens,
    pub presented_frames: u64,
    pub position_updates: u64,
    pub unknown_marker_ops: u64,
    pub last_camera: Option<CameraState>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lens(lens: Lens) -> Self {
        Self {
            lens,
            ..Self::default()
        }
    }

    pub fn marker(&self, id: ObjectId, kind: MarkerKind) -> Option<Vec3> {
        self.markers.get(&(id, kind)).copied()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Ids with a primary marker, ascending.
    pub fn primary_ids(&self) -> Vec<ObjectId> {
        self.markers
            .keys()
            .filter(|(_, kind)| *kind == MarkerKind::Primary)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl SceneHost for RecordingHost {
    fn add_marker(&mut self, id: ObjectId, kind: MarkerKind, position: Vec3) {
        self.markers.insert((id, kind), position);
    }

    fn remove_marker(&mut self, id: ObjectId, kind: MarkerKind) {
        if self.markers.remove(&(id, kind)).is_none() {
            self.unknown_marker_ops += 1;
        }
    }

    fn set_marker_position(&mut self, id: ObjectId, kind: MarkerKind, position: Vec3) {
        match self.markers.get_mut(&(id, kind)) {
            Some(p) => {
                *p = position;
                self.position_updates += 1;
            }
            None => self.unknown_marker_ops += 1,
        }
    }

    fn lens(&self) -> Lens {
        self.lens
    }

    fn present(&mut self, camera: &CameraState) {
        self.presented_frames += 1;
        self.last_camera = Some(*camera);
    }
}
