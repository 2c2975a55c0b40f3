use std::fmt;

/// Stable identifier of a tracked object (typically its NORAD catalog number).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub fn new(n: u64) -> Self {
        ObjectId(n)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(n: u64) -> Self {
        ObjectId(n)
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectId;

    #[test]
    fn orders_by_catalog_number() {
        let mut ids = vec![ObjectId(25544), ObjectId(5), ObjectId(44713)];
        ids.sort();
        assert_eq!(ids, vec![ObjectId(5), ObjectId(25544), ObjectId(44713)]);
        assert_eq!(ObjectId::from(7).to_string(), "7");
    }
}
