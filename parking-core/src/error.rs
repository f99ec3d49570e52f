//! Error types for parking operations

use thiserror::Error;

/// Kind of persisted entity, used to label not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Parking,
    ParkingSpace,
    Camera,
    User,
    Favorite,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Parking => "Parking",
            EntityKind::ParkingSpace => "Parking space",
            EntityKind::Camera => "Camera",
            EntityKind::User => "User",
            EntityKind::Favorite => "Favorite",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable store errors.
///
/// The occupancy path only ever surfaces `NotFound` and `Store`; cache
/// failures never reach this type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("Store operation '{operation}' failed: {reason}")]
    Store { operation: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn not_found(entity: EntityKind, id: impl std::fmt::Display) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn store(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StorageError::Store {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Cache client errors. Always recoverable from the caller's point of view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache command failed for key {key}: {reason}")]
    Command { key: String, reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown field '{field}' for {entity}")]
    UnknownField { entity: String, field: String },

    #[error("No fields to update")]
    EmptyUpdate,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for the parkings platform.
#[derive(Debug, Clone, Error)]
pub enum ParkingError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for parking operations.
pub type ParkingResult<T> = Result<T, ParkingError>;

// =============================================================================
// TESTS
// =============================================================================
