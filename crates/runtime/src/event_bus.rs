use std::collections::VecDeque;

use foundation::ids::ObjectId;

use crate::frame::Frame;

/// Structured engine events, recorded for traceability and for hosts that
/// want to react to tracking changes (info panels, status logs).
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    /// Absent from the latest snapshot but kept by the stale policy.
    ObjectRetained(ObjectId),
    RecordSkipped { reason: String },
    SnapshotApplied {
        created: usize,
        updated: usize,
        removed: usize,
        skipped: usize,
    },
    SelectionChanged(Option<ObjectId>),
    ViewReset,
    TrackingToggled(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub frame_index: u64,
    pub kind: EventKind,
}

/// Bounded event log. When full, the oldest events are dropped.
#[derive(Debug)]
pub struct EventBus {
    events: VecDeque<Event>,
    capacity: usize,
    dropped: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn emit(&mut self, frame: Frame, kind: EventKind) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(Event {
            frame_index: frame.index,
            kind,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events discarded because the log was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, EventKind};
    use crate::frame::Frame;
    use foundation::ids::ObjectId;

    #[test]
    fn records_events_with_frame_index() {
        let mut bus = EventBus::new();
        bus.emit(Frame::fixed(2, 0.1), EventKind::ObjectAdded(ObjectId(1)));
        assert_eq!(bus.len(), 1);
        assert_eq!(bus.iter().next().unwrap().frame_index, 2);
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(Frame::fixed(0, 1.0), EventKind::ViewReset);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn full_log_drops_oldest() {
        let mut bus = EventBus::with_capacity(2);
        for id in 1..=3 {
            bus.emit(Frame::fixed(0, 1.0), EventKind::ObjectAdded(ObjectId(id)));
        }
        let kinds: Vec<_> = bus.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ObjectAdded(ObjectId(2)),
                EventKind::ObjectAdded(ObjectId(3))
            ]
        );
        assert_eq!(bus.dropped(), 1);
    }
}
