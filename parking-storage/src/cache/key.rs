//! Cache key construction for occupancy entries.

use std::fmt;

use parking_core::ParkingId;

/// Default key namespace.
pub const DEFAULT_KEY_PREFIX: &str = "parking";

/// Cache key of a parking's occupancy: `"{prefix}:{id}:occupancy"`.
///
/// Keys can only be built from a parking id, so every reader and writer
/// agrees on the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccupancyKey(String);

impl OccupancyKey {
    pub fn new(prefix: &str, id: ParkingId) -> Self {
        Self(format!("{}:{}:occupancy", prefix, id))
    }

    pub fn with_default_prefix(id: ParkingId) -> Self {
        Self::new(DEFAULT_KEY_PREFIX, id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the parking id from a key produced with `prefix`.
    pub fn parse(prefix: &str, key: &str) -> Option<ParkingId> {
        key.strip_prefix(prefix)?
            .strip_prefix(':')?
            .strip_suffix(":occupancy")?
            .parse()
            .ok()
    }
}

impl fmt::Display for OccupancyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OccupancyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_key_format() {
        assert_eq!(OccupancyKey::with_default_prefix(42).as_str(), "parking:42:occupancy");
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert_eq!(OccupancyKey::parse("parking", "parking:abc:occupancy"), None);
        assert_eq!(OccupancyKey::parse("parking", "lot:1:occupancy"), None);
        assert_eq!(OccupancyKey::parse("parking", "parking:1:status"), None);
    }

    proptest! {
        #[test]
        fn prop_distinct_ids_never_collide(a in any::<i32>(), b in any::<i32>()) {
            prop_assume!(a != b);
            prop_assert_ne!(OccupancyKey::with_default_prefix(a), OccupancyKey::with_default_prefix(b));
        }
    }
}
