//! Field projection for the `*_fields` endpoints.
//!
//! Callers name the columns they want as a comma-separated list. Names are
//! checked against a per-entity whitelist, and the projection is taken from
//! the serialized entity, so no caller input ever reaches SQL text.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::entities::{Parking, User};
use crate::error::ValidationError;

/// Entities that support field projection.
pub trait Projectable: Serialize {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Fields a caller may request.
    const FIELDS: &'static [&'static str];
}

impl Projectable for Parking {
    const ENTITY: &'static str = "parking";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "description",
        "coordinates",
        "name",
        "name_obj",
        "adm_area",
        "district",
        "occupancy",
    ];
}

impl Projectable for User {
    const ENTITY: &'static str = "user";
    const FIELDS: &'static [&'static str] = &["id", "email", "phone_number", "subscription_status"];
}

/// Validated, de-duplicated list of requested fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    fields: Vec<String>,
}

impl FieldSelection {
    /// Parse a `fields=a,b,c` query value for entity `T`.
    pub fn parse<T: Projectable>(raw: &str) -> Result<Self, ValidationError> {
        let mut fields: Vec<String> = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !T::FIELDS.contains(&name) {
                return Err(ValidationError::UnknownField {
                    entity: T::ENTITY.to_string(),
                    field: name.to_string(),
                });
            }
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }

        if fields.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "fields".to_string(),
            });
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Keep only the selected keys of the serialized entity.
    pub fn project<T: Projectable>(&self, entity: &T) -> Result<Map<String, JsonValue>, ValidationError> {
        let value = serde_json::to_value(entity).map_err(|e| ValidationError::InvalidValue {
            field: T::ENTITY.to_string(),
            reason: e.to_string(),
        })?;

        let JsonValue::Object(mut object) = value else {
            return Err(ValidationError::InvalidValue {
                field: T::ENTITY.to_string(),
                reason: "entity did not serialize to an object".to_string(),
            });
        };

        let mut projected = Map::new();
        for field in &self.fields {
            let value = object.remove(field).unwrap_or(JsonValue::Null);
            projected.insert(field.clone(), value);
        }
        Ok(projected)
    }
}
