//! Parkings Core - Entity Types
//!
//! Plain data structures shared by every crate in the workspace: persisted
//! entities, coordinates and GeoJSON shaping, field projection, and the
//! error taxonomy. No I/O lives here.

pub mod entities;
pub mod error;
pub mod geo;
pub mod projection;

pub use entities::{
    occupancy_from_column, occupancy_to_column, Camera, CameraId, Coordinates, FavoriteParking,
    FavoriteParkingSummary, Occupancy, OccupancyRecord, Parking, ParkingId, ParkingSpace,
    ParkingSpaceId, User, UserId, UserStats,
};
pub use error::{
    CacheError, ConfigError, EntityKind, ParkingError, ParkingResult, StorageError, ValidationError,
};
pub use geo::{BoundingBox, ParkingFeature, ParkingProperties, PointGeometry};
pub use projection::{FieldSelection, Projectable};
