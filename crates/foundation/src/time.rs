/// Monotonic engine time in seconds.
///
/// The origin is chosen by whoever drives the frame clock; only differences
/// between two `Time`s carry meaning.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn from_secs(s: f64) -> Self {
        Time(s)
    }

    pub fn secs(self) -> f64 {
        self.0
    }

    /// Seconds elapsed since `earlier`. Negative if `earlier` is in the future.
    pub fn since(self, earlier: Time) -> f64 {
        self.0 - earlier.0
    }

    pub fn add_secs(self, s: f64) -> Self {
        Time(self.0 + s)
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn since_is_signed_difference() {
        let a = Time::from_secs(10.0);
        let b = a.add_secs(0.25);
        assert_eq!(b.since(a), 0.25);
        assert_eq!(a.since(b), -0.25);
    }
}
