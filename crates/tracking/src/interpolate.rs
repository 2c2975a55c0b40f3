use foundation::time::Time;
use scene::host::SceneHost;
use tracing::trace;

use crate::cache::PositionCache;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InterpolationSettings {
    /// Fraction of the remaining distance covered per second, before capping
    /// a single step at the full distance.
    pub damping_rate: f64,
    /// Multiplier on every step, in `[0, 1]`.
    pub smoothing: f64,
    /// Below this remaining distance `current` snaps onto `target`.
    pub snap_epsilon: f64,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            damping_rate: 30.0,
            smoothing: 1.0,
            snap_epsilon: 1e-9,
        }
    }
}

impl InterpolationSettings {
    /// Fraction of the remaining distance covered in a step of `dt_s`.
    ///
    /// Always in `[0, 1]`, so a step never overshoots the target.
    pub fn step_fraction(&self, dt_s: f64) -> f64 {
        if dt_s.is_nan() || dt_s <= 0.0 {
            return 0.0;
        }
        let lerp = (dt_s * self.damping_rate).min(1.0);
        (lerp * self.smoothing.clamp(0.0, 1.0)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Entries whose `current` changed this step.
    pub moved: usize,
    /// Entries that reached their target this step.
    pub arrived: usize,
}

/// Moves every cached `current` toward its `target`, once per frame.
///
/// The step size comes from the time since the previous tick, so replaying
/// the same `now` is a no-op and frame rate only changes step granularity.
#[derive(Debug, Clone, Default)]
pub struct Interpolator {
    settings: InterpolationSettings,
    last_tick: Option<Time>,
}

impl Interpolator {
    pub fn new(settings: InterpolationSettings) -> Self {
        Self {
            settings,
            last_tick: None,
        }
    }

    pub fn settings(&self) -> &InterpolationSettings {
        &self.settings
    }

    pub fn last_tick(&self) -> Option<Time> {
        self.last_tick
    }

    /// Frame step at engine time `now`. The first tick has a zero delta, as
    /// does a clock that went backwards.
    pub fn tick<H: SceneHost + ?Sized>(
        &mut self,
        now: Time,
        cache: &mut PositionCache,
        host: &mut H,
    ) -> TickStats {
        let dt = match self.last_tick {
            Some(last) => now.since(last).max(0.0),
            None => 0.0,
        };
        if self.last_tick.is_none_or(|last| now > last) {
            self.last_tick = Some(now);
        }
        self.advance(dt, cache, host)
    }

    /// Fixed-delta step, independent of the tick clock.
    pub fn advance<H: SceneHost + ?Sized>(
        &self,
        dt_s: f64,
        cache: &mut PositionCache,
        host: &mut H,
    ) -> TickStats {
        let mut stats = TickStats::default();
        let fraction = self.settings.step_fraction(dt_s);
        if fraction <= 0.0 {
            return stats;
        }

        let kinds = cache.marker_kinds();
        for (id, entry) in cache.entries.iter_mut() {
            if entry.current == entry.target {
                continue;
            }
            entry.current = entry.current + (entry.target - entry.current) * fraction;
            if entry.current.distance(entry.target) < self.settings.snap_epsilon {
                entry.current = entry.target;
            }
            if entry.current == entry.target {
                stats.arrived += 1;
            }
            stats.moved += 1;
            for kind in kinds {
                host.set_marker_position(*id, *kind, entry.current);
            }
        }
        trace!(dt_s, moved = stats.moved, arrived = stats.arrived, "interpolation step");
        stats
    }
}
