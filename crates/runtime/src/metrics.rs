use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Deterministic metrics aggregation.
///
/// Metrics never read the wall clock and are stored in sorted maps, so a
/// snapshot taken after the same sequence of operations is always identical.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
    pub gauges: Vec<(&'static str, f64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: &'static str, value: f64) {
        self.gauges.insert(name, value);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (*k, *v)).collect(),
            gauges: self.gauges.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    /// Single-line `key=value` rendering for periodic log output.
    pub fn summary_line(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.counters {
            let _ = write!(out, "{k}={v} ");
        }
        for (k, v) in &self.gauges {
            let _ = write!(out, "{k}={v} ");
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Metrics;

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.inc_counter("reconcile.created", 1);
        m.inc_counter("reconcile.created", 2);
        assert_eq!(m.counter("reconcile.created"), 3);
        assert_eq!(m.counter("missing"), 0);
    }

    #[test]
    fn gauges_overwrite() {
        let mut m = Metrics::new();
        assert_eq!(m.gauge("cache.entries"), None);
        m.set_gauge("cache.entries", 10.0);
        m.set_gauge("cache.entries", 11.0);
        assert_eq!(m.gauge("cache.entries"), Some(11.0));
    }

    #[test]
    fn snapshot_and_summary_are_sorted() {
        let mut m = Metrics::new();
        m.inc_counter("b", 1);
        m.inc_counter("a", 2);
        m.set_gauge("z", 1.5);

        let snap = m.snapshot();
        assert_eq!(snap.counters, vec![("a", 2), ("b", 1)]);
        assert_eq!(m.summary_line(), "a=2 b=1 z=1.5");
    }
}
