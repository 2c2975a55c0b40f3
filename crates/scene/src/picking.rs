use foundation::ids::ObjectId;
use foundation::math::precision::stable_total_cmp_f64;
use foundation::math::{Vec2, Vec3};

use crate::camera::{CameraState, Lens, ray_from_ndc};
use crate::host::MarkerKind;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// A marker that may be hit: its owner, its role and its rendered center.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickTarget {
    pub id: ObjectId,
    pub kind: MarkerKind,
    pub center: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub id: ObjectId,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    /// Hit radius around each primary marker center.
    pub marker_radius: f64,
    /// Radius of the opaque globe; hits behind it are discarded.
    pub occluder_radius: Option<f64>,
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            marker_radius: 0.02,
            occluder_radius: Some(1.0),
            max_distance: 1.0e30,
        }
    }
}

/// Ray picking against marker spheres.
///
/// Ordering contract:
/// - The closest hit along the (normalized) ray wins.
/// - If multiple markers are hit at the same distance, the lower `ObjectId` wins.
///
/// Notes:
/// - Only `MarkerKind::Primary` targets are hit-tested; decorative markers are ignored.
/// - A hit farther away than the globe surface along the same ray is occluded.
/// - An empty target set, or a degenerate ray, yields `None`.
pub fn pick_ray<I>(ray: Ray, targets: I, opts: PickOptions) -> Option<PickHit>
where
    I: IntoIterator<Item = PickTarget>,
{
    let dir = ray.dir.normalize()?;
    let globe_t = opts
        .occluder_radius
        .and_then(|r| ray_sphere_hit_t(ray.origin, dir, Vec3::ZERO, r));

    let mut best: Option<(f64, ObjectId)> = None;
    for target in targets {
        if target.kind != MarkerKind::Primary {
            continue;
        }
        let Some(t) = ray_sphere_hit_t(ray.origin, dir, target.center, opts.marker_radius) else {
            continue;
        };
        if t > opts.max_distance {
            continue;
        }
        if globe_t.is_some_and(|g| g < t) {
            continue;
        }

        best = match best {
            None => Some((t, target.id)),
            Some((bt, bid)) => {
                let ord = stable_total_cmp_f64(t, bt).then_with(|| target.id.cmp(&bid));
                if ord.is_lt() {
                    Some((t, target.id))
                } else {
                    Some((bt, bid))
                }
            }
        };
    }

    let (t, id) = best?;
    Some(PickHit {
        id,
        distance: t,
        point: Ray { origin: ray.origin, dir }.at(t),
    })
}

/// Screen picking: casts the ray from `camera` through `ndc`.
pub fn pick_ndc<I>(
    camera: &CameraState,
    lens: Lens,
    ndc: Vec2,
    targets: I,
    opts: PickOptions,
) -> Option<PickHit>
where
    I: IntoIterator<Item = PickTarget>,
{
    let ray = ray_from_ndc(camera, lens, ndc)?;
    pick_ray(ray, targets, opts)
}

/// Entry distance of a unit-direction ray into a sphere.
///
/// A ray starting inside the sphere hits at `t = 0`.
fn ray_sphere_hit_t(origin: Vec3, dir: Vec3, center: Vec3, radius: f64) -> Option<f64> {
    if radius.is_nan() || radius <= 0.0 {
        return None;
    }
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let s = disc.sqrt();
    let far = -b + s;
    if far < 0.0 {
        return None;
    }
    let near = -b - s;
    Some(near.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::{PickOptions, PickTarget, Ray, pick_ndc, pick_ray};
    use crate::camera::{CameraController, Lens, project_to_ndc};
    use crate::host::MarkerKind;
    use foundation::ids::ObjectId;
    use foundation::math::{Vec2, Vec3};

    fn primary(id: u64, center: Vec3) -> PickTarget {
        PickTarget {
            id: ObjectId(id),
            kind: MarkerKind::Primary,
            center,
        }
    }

    fn unoccluded() -> PickOptions {
        PickOptions {
            marker_radius: 1.0,
            occluder_radius: None,
            ..PickOptions::default()
        }
    }

    #[test]
    fn ray_picks_nearest_hit() {
        let targets = [
            primary(2, Vec3::new(10.0, 0.0, 0.0)),
            primary(1, Vec3::new(5.0, 0.0, 0.0)),
        ];
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let hit = pick_ray(ray, targets, unoccluded()).expect("hit");
        assert_eq!(hit.id, ObjectId(1));
        assert!((hit.distance - 4.0).abs() < 1e-12);
        assert_eq!(hit.point, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn tie_breaks_by_lower_id() {
        let targets = [
            primary(9, Vec3::new(5.0, 0.0, 0.0)),
            primary(3, Vec3::new(5.0, 0.0, 0.0)),
        ];
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        let hit = pick_ray(ray, targets, unoccluded()).expect("hit");
        assert_eq!(hit.id, ObjectId(3));
    }

    #[test]
    fn decorative_markers_are_not_pickable() {
        let halo = PickTarget {
            id: ObjectId(1),
            kind: MarkerKind::Halo,
            center: Vec3::new(5.0, 0.0, 0.0),
        };
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(pick_ray(ray, [halo], unoccluded()), None);
    }

    #[test]
    fn empty_scene_and_misses_yield_none() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(pick_ray(ray, std::iter::empty(), unoccluded()), None);
        let behind = [primary(1, Vec3::new(-5.0, 0.0, 0.0))];
        assert_eq!(pick_ray(ray, behind, unoccluded()), None);
        let degenerate = Ray::new(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(pick_ray(degenerate, [primary(1, Vec3::ZERO)], unoccluded()), None);
    }

    #[test]
    fn globe_occludes_far_side_markers() {
        let opts = PickOptions {
            marker_radius: 0.05,
            occluder_radius: Some(1.0),
            ..PickOptions::default()
        };
        let ray = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let far_side = [primary(7, Vec3::new(0.0, 0.0, -1.1))];
        assert_eq!(pick_ray(ray, far_side, opts), None);
        let near_side = [primary(8, Vec3::new(0.0, 0.0, 1.1))];
        assert_eq!(pick_ray(ray, near_side, opts).map(|h| h.id), Some(ObjectId(8)));
    }

    #[test]
    fn ndc_of_marker_picks_it() {
        let ctrl = CameraController::default();
        let lens = Lens::default();
        let marker = Vec3::new(0.4, 0.3, 1.0);
        let targets = [primary(25544, marker)];
        let opts = PickOptions::default();

        let ndc = project_to_ndc(ctrl.state(), lens, marker).expect("in front");
        let hit = pick_ndc(ctrl.state(), lens, ndc, targets, opts).expect("hit");
        assert_eq!(hit.id, ObjectId(25544));

        let empty_space = Vec2::new(0.95, -0.95);
        assert_eq!(pick_ndc(ctrl.state(), lens, empty_space, targets, opts), None);
    }
}
