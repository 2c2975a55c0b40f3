//! The globe view: one owning controller over the tracking state.
//!
//! Per frame, in order:
//! 1. the camera advances (auto-orbit),
//! 2. interpolation moves every marker toward its target,
//! 3. the host presents the frame.
//!
//! Snapshots are applied between frames, never during one.

use foundation::ids::ObjectId;
use foundation::math::Vec2;
use foundation::time::Time;
use runtime::event_bus::{EventBus, EventKind};
use runtime::frame::Frame;
use runtime::metrics::Metrics;
use scene::camera::{CameraController, CameraMode, CameraState, project_to_ndc};
use scene::host::SceneHost;
use scene::picking::{PickOptions, pick_ray};
use scene::selection::Selection;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheOptions, PositionCache};
use crate::config::TrackingConfig;
use crate::interpolate::{Interpolator, TickStats};
use crate::reconcile::ReconcileReport;
use crate::snapshot::{Snapshot, TrackedObject};

pub struct GlobeView<H: SceneHost> {
    config: TrackingConfig,
    host: H,
    cache: PositionCache,
    interpolator: Interpolator,
    camera: CameraController,
    selection: Selection,
    pick: PickOptions,
    tracking_enabled: bool,
    frame: Option<Frame>,
    events: EventBus,
    metrics: Metrics,
}

impl<H: SceneHost> GlobeView<H> {
    /// Builds a view over `host`. The config is sanitized first.
    pub fn new(config: TrackingConfig, host: H) -> Self {
        let config = config.sanitized();
        let cache = PositionCache::new(CacheOptions {
            projection: config.projection(),
            stale_policy: config.stale_policy,
            halo: config.halo,
        });
        Self {
            interpolator: Interpolator::new(config.interpolation()),
            camera: CameraController::new(config.camera_settings()),
            pick: config.pick_options(),
            config,
            host,
            cache,
            selection: Selection::new(),
            tracking_enabled: true,
            frame: None,
            events: EventBus::new(),
            metrics: Metrics::new(),
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    pub fn camera(&self) -> &CameraState {
        self.camera.state()
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera.mode()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn tracking_enabled(&self) -> bool {
        self.tracking_enabled
    }

    /// The most recent frame, if any has run.
    pub fn last_frame(&self) -> Option<Frame> {
        self.frame
    }

    /// Applies a snapshot received at `now`. Ignored while tracking is off.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, now: Time) -> ReconcileReport {
        if !self.tracking_enabled {
            debug!(records = snapshot.record_count(), "tracking disabled; snapshot ignored");
            return ReconcileReport::default();
        }
        let report = self.cache.reconcile(snapshot, now, &mut self.host);
        let frame = self.event_frame();

        for id in &report.created {
            self.events.emit(frame, EventKind::ObjectAdded(*id));
        }
        for id in &report.removed {
            self.events.emit(frame, EventKind::ObjectRemoved(*id));
            if self.selection.forget(*id) {
                self.events.emit(frame, EventKind::SelectionChanged(None));
            }
        }
        for id in &report.retained {
            self.events.emit(frame, EventKind::ObjectRetained(*id));
        }
        for skipped in &report.skipped {
            self.events.emit(
                frame,
                EventKind::RecordSkipped {
                    reason: skipped.error.to_string(),
                },
            );
        }
        self.events.emit(
            frame,
            EventKind::SnapshotApplied {
                created: report.created.len(),
                updated: report.updated.len(),
                removed: report.removed.len(),
                skipped: report.skipped.len(),
            },
        );

        self.metrics.inc_counter("reconcile.snapshots", 1);
        self.metrics.inc_counter("reconcile.created", report.created.len() as u64);
        self.metrics.inc_counter("reconcile.updated", report.updated.len() as u64);
        self.metrics.inc_counter("reconcile.removed", report.removed.len() as u64);
        self.metrics.inc_counter("reconcile.retained", report.retained.len() as u64);
        self.metrics.inc_counter("reconcile.skipped", report.skipped.len() as u64);
        self.metrics.inc_counter("reconcile.duplicates", report.duplicates.len() as u64);
        self.update_cache_gauges();
        report
    }

    /// Runs one frame at engine time `now`.
    pub fn frame(&mut self, now: Time) -> Frame {
        let frame = match self.frame {
            Some(previous) => previous.next_at(now),
            None => Frame::first(now),
        };
        self.frame = Some(frame);

        self.camera.advance_frame();
        let stats: TickStats = self.interpolator.tick(now, &mut self.cache, &mut self.host);
        self.host.present(self.camera.state());

        self.metrics.inc_counter("frames", 1);
        self.metrics.set_gauge("interp.moved", stats.moved as f64);
        frame
    }

    /// Click or tap at `ndc`. Selects the nearest primary marker under the
    /// pointer, or clears the selection on empty space.
    pub fn click(&mut self, ndc: Vec2) -> Option<ObjectId> {
        let picked = self
            .host
            .cast_ray(self.camera.state(), ndc)
            .and_then(|ray| pick_ray(ray, self.cache.pick_targets(), self.pick))
            .map(|hit| hit.id);
        self.metrics.inc_counter("picks", 1);
        if self.selection.apply_pick(picked) {
            let frame = self.event_frame();
            self.events.emit(frame, EventKind::SelectionChanged(picked));
            if let Some(id) = picked {
                debug!(%id, "object selected");
            }
        }
        picked
    }

    /// The selected object's latest data.
    pub fn selection(&self) -> Option<&TrackedObject> {
        let id = self.selection.get()?;
        self.cache.get(id).map(|entry| &entry.object)
    }

    pub fn selected_entry(&self) -> Option<&CacheEntry> {
        self.cache.get(self.selection.get()?)
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            let frame = self.event_frame();
            self.events.emit(frame, EventKind::SelectionChanged(None));
        }
    }

    /// NDC of an object's marker, for label placement. `None` if unknown or
    /// behind the eye.
    pub fn screen_position(&self, id: ObjectId) -> Option<Vec2> {
        let entry = self.cache.get(id)?;
        project_to_ndc(self.camera.state(), self.host.lens(), entry.current)
    }

    /// Turning tracking off removes every object and marker; turning it back
    /// on waits for the next snapshot.
    pub fn set_tracking_enabled(&mut self, enabled: bool) {
        if self.tracking_enabled == enabled {
            return;
        }
        self.tracking_enabled = enabled;
        let frame = self.event_frame();
        if !enabled {
            let removed = self.cache.clear(&mut self.host);
            for id in &removed {
                self.events.emit(frame, EventKind::ObjectRemoved(*id));
            }
            if self.selection.clear() {
                self.events.emit(frame, EventKind::SelectionChanged(None));
            }
            self.update_cache_gauges();
        }
        info!(enabled, "tracking toggled");
        self.events.emit(frame, EventKind::TrackingToggled(enabled));
    }

    pub fn pointer_down(&mut self, pos: Vec2) {
        self.camera.pointer_down(pos);
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        self.camera.pointer_move(pos);
    }

    pub fn pointer_up(&mut self) {
        self.camera.pointer_up();
    }

    pub fn wheel(&mut self, delta: f64) {
        self.camera.wheel(delta);
    }

    pub fn pinch_start(&mut self, span: f64) {
        self.camera.pinch_start(span);
    }

    pub fn pinch_move(&mut self, span: f64) {
        self.camera.pinch_move(span);
    }

    pub fn pinch_end(&mut self) {
        self.camera.pinch_end();
    }

    pub fn set_auto_orbit(&mut self, enabled: bool) {
        self.camera.set_auto_orbit(enabled);
    }

    pub fn reset_view(&mut self) {
        self.camera.reset_view();
        let frame = self.event_frame();
        self.events.emit(frame, EventKind::ViewReset);
    }

    fn event_frame(&self) -> Frame {
        self.frame.unwrap_or(Frame::first(Time::ZERO))
    }

    fn update_cache_gauges(&mut self) {
        self.metrics.set_gauge("cache.entries", self.cache.len() as f64);
        self.metrics.set_gauge("cache.stale", self.cache.stale_count() as f64);
    }
}
