//! Payload validation against a named schema.
//!
//! Validation never fails with an error value; malformed input (null
//! payload, unknown payload type) produces a well-formed
//! [`ValidationResult`] with `valid == false`.

use serde::Serialize;
use serde_json::Value;

use crate::schema::SchemaRegistry;

// ------------------------------------------------------------------ //
//  Result type                                                        //
// ------------------------------------------------------------------ //

/// Outcome of validating one payload against one schema.
///
/// Produced fresh per call, never mutated after return.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub missing_required: Vec<String>,
    pub missing_optional: Vec<String>,
    pub unexpected_fields: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn failure(error: String) -> Self {
        Self {
            valid: false,
            missing_required: Vec::new(),
            missing_optional: Vec::new(),
            unexpected_fields: Vec::new(),
            errors: vec![error],
            warnings: Vec::new(),
        }
    }
}

/// A field counts as present only when the key exists and its value is
/// non-null.
pub(crate) fn field_present(payload: &serde_json::Map<String, Value>, field: &str) -> bool {
    matches!(payload.get(field), Some(v) if !v.is_null())
}

// ------------------------------------------------------------------ //
//  Validation                                                         //
// ------------------------------------------------------------------ //

impl SchemaRegistry {
    /// Validate `payload` against the schema registered as `payload_type`.
    pub fn validate(&self, payload: &Value, payload_type: &str) -> ValidationResult {
        if payload.is_null() {
            return ValidationResult::failure("No payload data available".to_string());
        }

        let schema = match self.get(payload_type) {
            Some(s) => s,
            None => {
                return ValidationResult::failure(format!(
                    "Unknown payload type: {payload_type}"
                ));
            }
        };

        let object = match payload.as_object() {
            Some(o) => o,
            None => {
                return ValidationResult::failure(format!(
                    "Payload for {payload_type} is not a JSON object"
                ));
            }
        };

        let mut result = ValidationResult {
            valid: false,
            missing_required: Vec::new(),
            missing_optional: Vec::new(),
            unexpected_fields: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        for field in &schema.required_fields {
            if !field_present(object, field) {
                result.missing_required.push(field.clone());
                result
                    .errors
                    .push(format!("Missing required field: {field}"));
            }
        }

        for field in &schema.optional_fields {
            if !field_present(object, field) {
                result.missing_optional.push(field.clone());
            }
        }

        for key in object.keys() {
            let known = schema.required_fields.iter().any(|f| f == key)
                || schema.optional_fields.iter().any(|f| f == key);
            if !known {
                result.unexpected_fields.push(key.clone());
                result
                    .warnings
                    .push(format!("Unexpected field: {key}"));
            }
        }

        result.valid = result.missing_required.is_empty() && result.errors.is_empty();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin()
    }

    #[test]
    fn null_payload_is_invalid() {
        let result = registry().validate(&Value::Null, "temp_rh_v1");
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["No payload data available"]);
        assert!(result.missing_required.is_empty());
        assert!(result.missing_optional.is_empty());
        assert!(result.unexpected_fields.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn unknown_payload_type_is_invalid() {
        let result = registry().validate(&json!({"temperature": 20.0}), "mystery_v9");
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Unknown payload type: mystery_v9"]);
    }

    #[test]
    fn non_object_payload_is_invalid() {
        let result = registry().validate(&json!([1, 2, 3]), "temp_rh_v1");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn full_payload_is_valid() {
        let payload = json!({"temperature": 3.5, "humidity": 62, "battery_level": 95});
        let result = registry().validate(&payload, "temp_rh_v1");
        assert!(result.valid);
        assert!(result.missing_required.is_empty());
        assert!(result.missing_optional.is_empty());
        assert!(result.unexpected_fields.is_empty());
    }

    #[test]
    fn missing_required_field_fails() {
        let payload = json!({"humidity": 62});
        let result = registry().validate(&payload, "temp_rh_v1");
        assert!(!result.valid);
        assert_eq!(result.missing_required, vec!["temperature"]);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn null_valued_required_field_counts_as_missing() {
        let payload = json!({"temperature": null, "humidity": 62});
        let result = registry().validate(&payload, "temp_rh_v1");
        assert!(!result.valid);
        assert_eq!(result.missing_required, vec!["temperature"]);
    }

    #[test]
    fn missing_optional_field_is_recorded_without_error() {
        let payload = json!({"temperature": 21.0});
        let result = registry().validate(&payload, "temp_rh_v1");
        assert!(result.valid);
        assert_eq!(result.missing_optional, vec!["humidity", "battery_level"]);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn unexpected_field_warns_but_stays_valid() {
        let payload = json!({"temperature": 21.0, "pressure": 1013});
        let result = registry().validate(&payload, "temp_rh_v1");
        assert!(result.valid);
        assert_eq!(result.unexpected_fields, vec!["pressure"]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Unexpected"));
    }

    #[test]
    fn valid_iff_no_missing_required_and_no_errors() {
        let cases = [
            json!({"temperature": 1.0}),
            json!({"humidity": 50}),
            json!({"temperature": 1.0, "extra": true}),
            Value::Null,
        ];
        for payload in &cases {
            let result = registry().validate(payload, "temp_rh_v1");
            assert_eq!(
                result.valid,
                result.missing_required.is_empty() && result.errors.is_empty()
            );
        }
    }
}
