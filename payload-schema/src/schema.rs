//! Payload schema catalog.
//!
//! Each decoder emits one of a closed set of payload shapes. A
//! [`PayloadSchema`] names the shape, the fields a payload of that shape
//! must carry, and the fields it may carry. The [`SchemaRegistry`] holds
//! the full catalog and is immutable after construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel payload type returned when inference cannot label a payload.
pub const UNCLASSIFIED: &str = "unclassified";

// ------------------------------------------------------------------ //
//  Types                                                              //
// ------------------------------------------------------------------ //

/// A named, versioned contract for one decoded payload shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayloadSchema {
    /// Unique key, e.g. `temp_rh_v1`. Matches the registry key.
    pub payload_type: String,
    /// Declared schema version, informational only.
    pub version: String,
    /// Fields every payload of this type must carry. Never empty.
    pub required_fields: Vec<String>,
    /// Fields a payload of this type may carry.
    pub optional_fields: Vec<String>,
}

impl PayloadSchema {
    pub fn new(
        payload_type: &str,
        version: &str,
        required: &[&str],
        optional: &[&str],
    ) -> Self {
        Self {
            payload_type: payload_type.to_string(),
            version: version.to_string(),
            required_fields: required.iter().map(|s| s.to_string()).collect(),
            optional_fields: optional.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Total number of fields the schema describes, required plus optional.
    pub fn field_count(&self) -> usize {
        self.required_fields.len() + self.optional_fields.len()
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("schema {0} has no required fields")]
    NoRequiredFields(String),
    #[error("duplicate payload type {0}")]
    DuplicatePayloadType(String),
}

// ------------------------------------------------------------------ //
//  Registry                                                           //
// ------------------------------------------------------------------ //

/// Immutable catalog of payload schemas, keyed by payload type.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, PayloadSchema>,
}

impl SchemaRegistry {
    /// Build a registry, rejecting schemas that violate the catalog
    /// invariants (empty required-field list, duplicate payload type).
    pub fn new(schemas: Vec<PayloadSchema>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for schema in schemas {
            if schema.required_fields.is_empty() {
                return Err(RegistryError::NoRequiredFields(schema.payload_type));
            }
            if map.contains_key(&schema.payload_type) {
                return Err(RegistryError::DuplicatePayloadType(schema.payload_type));
            }
            map.insert(schema.payload_type.clone(), schema);
        }
        Ok(Self { schemas: map })
    }

    /// The built-in catalog of known payload types.
    pub fn builtin() -> Self {
        let schemas = vec![
            PayloadSchema::new(
                "temp_rh_v1",
                "1",
                &["temperature"],
                &["humidity", "battery_level"],
            ),
            PayloadSchema::new("door_v1", "1", &["door_open"], &["battery_level"]),
            PayloadSchema::new("temperature_only_v1", "1", &["temperature"], &[]),
            PayloadSchema::new(
                "air_quality_co2_v1",
                "1",
                &["co2_ppm"],
                &["temperature", "humidity", "battery_level"],
            ),
            PayloadSchema::new(
                "multi_door_temp_v1",
                "1",
                &["door_open", "temperature"],
                &["humidity", "battery_level"],
            ),
            PayloadSchema::new(
                "soil_moisture_v1",
                "1",
                &["soil_moisture"],
                &["ambient_temp_c", "battery_level"],
            ),
            PayloadSchema::new("signal_v1", "1", &["rssi"], &["snr", "battery_level"]),
        ];
        // The built-in catalog satisfies the invariants by construction.
        Self::new(schemas).expect("built-in schema catalog is valid")
    }

    pub fn get(&self, payload_type: &str) -> Option<&PayloadSchema> {
        self.schemas.get(payload_type)
    }

    pub fn contains(&self, payload_type: &str) -> bool {
        self.schemas.contains_key(payload_type)
    }

    /// Schemas in stable (lexicographic) order.
    pub fn iter(&self) -> impl Iterator<Item = &PayloadSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let reg = SchemaRegistry::builtin();
        assert!(!reg.is_empty());
        for schema in reg.iter() {
            assert!(
                !schema.required_fields.is_empty(),
                "schema {} has no required fields",
                schema.payload_type
            );
        }
    }

    #[test]
    fn builtin_keys_match_payload_type() {
        let reg = SchemaRegistry::builtin();
        for schema in reg.iter() {
            assert_eq!(
                reg.get(&schema.payload_type).unwrap().payload_type,
                schema.payload_type
            );
        }
    }

    #[test]
    fn rejects_empty_required_fields() {
        let result = SchemaRegistry::new(vec![PayloadSchema::new("bad_v1", "1", &[], &["x"])]);
        assert!(matches!(result, Err(RegistryError::NoRequiredFields(t)) if t == "bad_v1"));
    }

    #[test]
    fn rejects_duplicate_payload_type() {
        let result = SchemaRegistry::new(vec![
            PayloadSchema::new("dup_v1", "1", &["a"], &[]),
            PayloadSchema::new("dup_v1", "2", &["b"], &[]),
        ]);
        assert!(matches!(result, Err(RegistryError::DuplicatePayloadType(t)) if t == "dup_v1"));
    }

    #[test]
    fn lookup_unknown_type_is_none() {
        let reg = SchemaRegistry::builtin();
        assert!(reg.get("nonexistent_v1").is_none());
        assert!(!reg.contains("nonexistent_v1"));
    }
}
