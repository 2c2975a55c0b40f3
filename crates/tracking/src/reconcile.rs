//! Applying a snapshot to the position cache.
//!
//! The previous entry map is taken out of the cache and drained by the
//! snapshot: each snapshot id moves its entry (or a new one) into the next
//! map, so whatever is left over afterwards is exactly the set of absent
//! ids. Total work is linear in snapshot size plus the absent count.

use std::collections::HashMap;
use std::mem;

use foundation::ids::ObjectId;
use foundation::math::Vec3;
use foundation::time::Time;
use scene::host::SceneHost;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, PositionCache, add_markers, remove_markers};
use crate::config::StalePolicy;
use crate::snapshot::{SkippedRecord, Snapshot};

/// Lower bound on the time between two targets used for velocity, seconds.
pub const MIN_VELOCITY_DT_S: f64 = 1e-3;

/// What one reconciliation did, per category. Id lists are ascending except
/// `created` and `updated`, which follow snapshot order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub created: Vec<ObjectId>,
    pub updated: Vec<ObjectId>,
    pub removed: Vec<ObjectId>,
    pub retained: Vec<ObjectId>,
    pub skipped: Vec<SkippedRecord>,
    /// Ids that appeared more than once; the last record was used.
    pub duplicates: Vec<ObjectId>,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

impl PositionCache {
    /// Applies a whole snapshot at `now`.
    ///
    /// A snapshot whose every record was rejected is treated like a missing
    /// snapshot: the cache and the scene are left untouched.
    pub fn reconcile<H: SceneHost + ?Sized>(
        &mut self,
        snapshot: &Snapshot,
        now: Time,
        host: &mut H,
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            skipped: snapshot.skipped.clone(),
            ..ReconcileReport::default()
        };
        for skipped in &report.skipped {
            warn!(
                index = skipped.index,
                id = ?skipped.id,
                "skipping snapshot record: {}",
                skipped.error
            );
        }
        if snapshot.objects.is_empty() && !snapshot.skipped.is_empty() {
            warn!("every record in the snapshot was rejected; keeping previous state");
            return report;
        }

        // Last record wins for repeated ids.
        let mut winner: HashMap<ObjectId, usize> = HashMap::with_capacity(snapshot.objects.len());
        for (index, object) in snapshot.objects.iter().enumerate() {
            if winner.insert(object.id, index).is_some() {
                report.duplicates.push(object.id);
            }
        }
        report.duplicates.sort_unstable();
        report.duplicates.dedup();

        let projection = self.options.projection;
        let halo = self.options.halo;
        let mut previous = mem::take(&mut self.entries);
        let mut next = HashMap::with_capacity(winner.len());

        for (index, object) in snapshot.objects.iter().enumerate() {
            if winner.get(&object.id) != Some(&index) {
                continue;
            }
            let position = projection.project(object.lat, object.lng, object.altitude_km);
            let entry = match previous.remove(&object.id) {
                Some(mut entry) => {
                    let dt = now.since(entry.last_update).max(MIN_VELOCITY_DT_S);
                    entry.velocity_estimate = (position - entry.target) / dt;
                    entry.target = position;
                    entry.last_update = now;
                    entry.last_seen = now;
                    entry.stale = false;
                    entry.object = object.clone();
                    report.updated.push(object.id);
                    entry
                }
                None => {
                    add_markers(host, object.id, halo, position);
                    report.created.push(object.id);
                    CacheEntry::new(object.clone(), position, now)
                }
            };
            next.insert(object.id, entry);
        }

        let policy = self.options.stale_policy;
        for (id, mut entry) in previous {
            let keep = match policy {
                StalePolicy::Purge => false,
                StalePolicy::Retain => true,
                StalePolicy::Grace { seconds } => now.since(entry.last_seen) <= seconds,
            };
            if keep {
                entry.stale = true;
                entry.velocity_estimate = Vec3::ZERO;
                next.insert(id, entry);
                report.retained.push(id);
            } else {
                remove_markers(host, id, halo);
                report.removed.push(id);
            }
        }
        report.removed.sort_unstable();
        report.retained.sort_unstable();

        self.entries = next;
        debug!(
            created = report.created.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            retained = report.retained.len(),
            skipped = report.skipped.len(),
            entries = self.entries.len(),
            "snapshot reconciled"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::ReconcileReport;
    use crate::cache::{CacheOptions, PositionCache};
    use crate::config::StalePolicy;
    use crate::snapshot::{Snapshot, TrackedObject};
    use foundation::ids::ObjectId;
    use foundation::math::GlobeProjection;
    use foundation::time::Time;
    use pretty_assertions::assert_eq;
    use scene::host::{MarkerKind, RecordingHost};

    fn cache(policy: StalePolicy) -> PositionCache {
        PositionCache::new(CacheOptions {
            projection: GlobeProjection::default(),
            stale_policy: policy,
            halo: false,
        })
    }

    fn sat(id: u64, lat: f64, lng: f64) -> TrackedObject {
        TrackedObject::new(id, format!("SAT-{id}"), lat, lng, 550.0)
    }

    #[test]
    fn new_ids_start_settled_with_markers() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Purge);
        let report = cache.reconcile(&Snapshot::from_objects([sat(25544, 10.0, 20.0)]), Time(0.0), &mut host);

        assert_eq!(report.created, vec![ObjectId(25544)]);
        let entry = cache.get(ObjectId(25544)).unwrap();
        assert_eq!(entry.current, entry.target);
        assert_eq!(
            entry.target,
            GlobeProjection::default().project(10.0, 20.0, 550.0)
        );
        assert_eq!(host.marker(ObjectId(25544), MarkerKind::Primary), Some(entry.current));
    }

    #[test]
    fn known_ids_retarget_and_estimate_velocity() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Purge);
        cache.reconcile(&Snapshot::from_objects([sat(1, 10.0, 20.0)]), Time(0.0), &mut host);
        let first = cache.get(ObjectId(1)).unwrap().target;

        let report = cache.reconcile(&Snapshot::from_objects([sat(1, 10.0, 21.0)]), Time(10.0), &mut host);
        assert_eq!(report.updated, vec![ObjectId(1)]);
        let entry = cache.get(ObjectId(1)).unwrap();
        assert_eq!(entry.current, first);
        assert_eq!(entry.velocity_estimate, (entry.target - first) / 10.0);
        assert_eq!(entry.last_update, Time(10.0));
    }

    #[test]
    fn same_instant_update_uses_minimum_dt() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Purge);
        cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 0.0)]), Time(3.0), &mut host);
        cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 1.0)]), Time(3.0), &mut host);
        let v = cache.get(ObjectId(1)).unwrap().velocity_estimate;
        assert!(v.is_finite());
        assert!(v.length() > 0.0);
    }

    #[test]
    fn purge_removes_absent_ids() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Purge);
        cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 0.0), sat(2, 0.0, 10.0)]), Time(0.0), &mut host);
        let report = cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 1.0)]), Time(10.0), &mut host);

        assert_eq!(report.removed, vec![ObjectId(2)]);
        assert!(!cache.contains(ObjectId(2)));
        assert_eq!(host.primary_ids(), vec![ObjectId(1)]);
    }

    #[test]
    fn retain_keeps_absent_ids_frozen() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Retain);
        cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 0.0), sat(2, 0.0, 10.0)]), Time(0.0), &mut host);
        let before = cache.get(ObjectId(2)).unwrap().target;
        let report = cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 1.0)]), Time(10.0), &mut host);

        assert_eq!(report.retained, vec![ObjectId(2)]);
        let entry = cache.get(ObjectId(2)).unwrap();
        assert!(entry.stale);
        assert_eq!(entry.target, before);
        assert_eq!(entry.last_seen, Time(0.0));
        assert_eq!(host.primary_ids(), vec![ObjectId(1), ObjectId(2)]);

        // Reappearing clears the flag.
        cache.reconcile(&Snapshot::from_objects([sat(2, 0.0, 11.0)]), Time(20.0), &mut host);
        assert!(!cache.get(ObjectId(2)).unwrap().stale);
    }

    #[test]
    fn grace_purges_after_window() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Grace { seconds: 15.0 });
        cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 0.0), sat(2, 0.0, 10.0)]), Time(0.0), &mut host);

        let only_one = Snapshot::from_objects([sat(1, 0.0, 1.0)]);
        let report = cache.reconcile(&only_one, Time(10.0), &mut host);
        assert_eq!(report.retained, vec![ObjectId(2)]);

        let report = cache.reconcile(&only_one, Time(20.0), &mut host);
        assert_eq!(report.removed, vec![ObjectId(2)]);
        assert_eq!(host.primary_ids(), vec![ObjectId(1)]);
    }

    #[test]
    fn duplicate_ids_resolve_to_last_record() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Purge);
        let snapshot = Snapshot::from_objects([sat(7, 0.0, 0.0), sat(8, 5.0, 5.0), sat(7, 30.0, 40.0)]);
        let report = cache.reconcile(&snapshot, Time(0.0), &mut host);

        assert_eq!(report.duplicates, vec![ObjectId(7)]);
        assert_eq!(report.created, vec![ObjectId(8), ObjectId(7)]);
        assert_eq!(cache.get(ObjectId(7)).unwrap().object.lat, 30.0);
        assert_eq!(host.marker_count(), 2);
        assert_eq!(host.unknown_marker_ops, 0);
    }

    #[test]
    fn rejected_records_do_not_block_the_batch() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Purge);
        let snapshot = Snapshot::parse_json(
            r#"[{"id": 1, "lat": 0, "lng": 0, "altitudeKm": 500}, {"id": 2, "lat": 0, "altitudeKm": 500}]"#,
        )
        .unwrap();
        let report = cache.reconcile(&snapshot, Time(0.0), &mut host);
        assert_eq!(report.created, vec![ObjectId(1)]);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn fully_rejected_snapshot_keeps_previous_state() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Purge);
        cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 0.0)]), Time(0.0), &mut host);

        let garbage = Snapshot::parse_json(r#"[{"lat": 0}]"#).unwrap();
        let report = cache.reconcile(&garbage, Time(10.0), &mut host);
        assert!(!report.changed());
        assert!(cache.contains(ObjectId(1)));
    }

    #[test]
    fn empty_snapshot_purges_everything() {
        let mut host = RecordingHost::new();
        let mut cache = cache(StalePolicy::Purge);
        cache.reconcile(&Snapshot::from_objects([sat(1, 0.0, 0.0)]), Time(0.0), &mut host);
        let report = cache.reconcile(&Snapshot::default(), Time(10.0), &mut host);
        assert_eq!(
            report,
            ReconcileReport {
                removed: vec![ObjectId(1)],
                ..ReconcileReport::default()
            }
        );
        assert_eq!(host.marker_count(), 0);
    }
}
