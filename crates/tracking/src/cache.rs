use std::collections::HashMap;

use foundation::ids::ObjectId;
use foundation::math::{GlobeProjection, Vec3};
use foundation::time::Time;
use scene::host::{MarkerKind, SceneHost};
use scene::picking::PickTarget;

use crate::config::StalePolicy;
use crate::snapshot::TrackedObject;

/// Render-space state of one tracked object.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Where the marker is drawn. Moved every frame by interpolation.
    pub current: Vec3,
    /// Where the latest snapshot placed the object.
    pub target: Vec3,
    /// Render units per second between the last two targets.
    pub velocity_estimate: Vec3,
    /// Time of the last reconciliation that touched this entry.
    pub last_update: Time,
    /// Time of the last snapshot that contained this id.
    pub last_seen: Time,
    pub stale: bool,
    pub object: TrackedObject,
}

impl CacheEntry {
    pub(crate) fn new(object: TrackedObject, position: Vec3, now: Time) -> Self {
        Self {
            current: position,
            target: position,
            velocity_estimate: Vec3::ZERO,
            last_update: now,
            last_seen: now,
            stale: false,
            object,
        }
    }

    /// Seconds since the last reconciliation of this entry.
    pub fn age(&self, now: Time) -> f64 {
        now.since(self.last_update)
    }

    pub fn remaining_distance(&self) -> f64 {
        self.current.distance(self.target)
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }
}

/// Settings the cache applies while reconciling.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct CacheOptions {
    pub projection: GlobeProjection,
    pub stale_policy: StalePolicy,
    pub halo: bool,
}

/// Per-object render state, keyed by id.
///
/// Every entry has a primary marker in the scene host (and a halo when
/// enabled); the cache is the only code that adds or removes them.
#[derive(Debug, Default)]
pub struct PositionCache {
    pub(crate) entries: HashMap<ObjectId, CacheEntry>,
    pub(crate) options: CacheOptions,
}

impl PositionCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            entries: HashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &CacheEntry)> + '_ {
        self.entries.iter()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn stale_count(&self) -> usize {
        self.entries.values().filter(|e| e.stale).count()
    }

    /// Primary markers at their current positions, for picking.
    pub fn pick_targets(&self) -> impl Iterator<Item = PickTarget> + '_ {
        self.entries.iter().map(|(id, entry)| PickTarget {
            id: *id,
            kind: MarkerKind::Primary,
            center: entry.current,
        })
    }

    /// Removes every entry and its markers. Returns the removed ids, ascending.
    pub fn clear<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Vec<ObjectId> {
        let mut removed: Vec<ObjectId> = self.entries.drain().map(|(id, _)| id).collect();
        removed.sort_unstable();
        for id in &removed {
            remove_markers(host, *id, self.options.halo);
        }
        removed
    }

    pub(crate) fn marker_kinds(&self) -> &'static [MarkerKind] {
        marker_kinds(self.options.halo)
    }
}

pub(crate) fn marker_kinds(halo: bool) -> &'static [MarkerKind] {
    if halo {
        &[MarkerKind::Primary, MarkerKind::Halo]
    } else {
        &[MarkerKind::Primary]
    }
}

pub(crate) fn add_markers<H: SceneHost + ?Sized>(host: &mut H, id: ObjectId, halo: bool, at: Vec3) {
    for kind in marker_kinds(halo) {
        host.add_marker(id, *kind, at);
    }
}

pub(crate) fn remove_markers<H: SceneHost + ?Sized>(host: &mut H, id: ObjectId, halo: bool) {
    for kind in marker_kinds(halo) {
        host.remove_marker(id, *kind);
    }
}
