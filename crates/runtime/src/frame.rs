use foundation::time::Time;

/// Per-frame metadata.
///
/// Frames are stamped by whoever owns the clock (the viewer loop or a test),
/// so the engine itself never reads wall-clock time and can be replayed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame (0 for the first frame).
    pub dt_s: f64,
    /// Engine time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn first(time: Time) -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time,
        }
    }

    /// A frame on a fixed timestep starting at `Time::ZERO`.
    pub fn fixed(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    /// The frame following `self`, stamped at `time`.
    ///
    /// A clock that stepped backwards yields `dt_s == 0` rather than a
    /// negative delta.
    pub fn next_at(self, time: Time) -> Self {
        Self {
            index: self.index + 1,
            dt_s: time.since(self.time).max(0.0),
            time,
        }
    }
}
