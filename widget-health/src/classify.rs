//! Payload → widget state classification bridge.
//!
//! Wires the schema crate into the state vocabulary: infer the payload's
//! type, compare it against what the widget expects, then validate and
//! map the outcome onto the pipeline-failure states. This is the single
//! call a widget's data hook makes per render.

use serde_json::Value;
use tracing::debug;

use payload_schema::{SchemaRegistry, UNCLASSIFIED};

use crate::state::WidgetStateInfo;
use crate::status::WidgetHealthStatus;

/// Classify one payload for a widget expecting `expected_type`.
///
/// Order of checks: decoder label contradiction (mismatch) first, then
/// hard schema failures, then partial payloads, then healthy.
pub fn classify_payload(
    registry: &SchemaRegistry,
    payload: &Value,
    expected_type: &str,
) -> WidgetStateInfo {
    let inference = registry.infer(payload);
    if inference.payload_type != UNCLASSIFIED
        && inference.payload_type != expected_type
        && !inference.is_ambiguous
    {
        debug!(
            expected = expected_type,
            inferred = %inference.payload_type,
            confidence = inference.confidence,
            "payload label contradicts widget expectation"
        );
        return WidgetStateInfo::mismatch(expected_type, &inference.payload_type);
    }

    let validation = registry.validate(payload, expected_type);
    if !validation.missing_required.is_empty() {
        return WidgetStateInfo::schema_failed(&validation.missing_required);
    }
    if !validation.valid {
        // Null payload, unknown type, or a non-object record.
        let detail = validation.errors.join("; ");
        return WidgetStateInfo::of(WidgetHealthStatus::NoData).with_root_cause(&detail);
    }
    if !validation.missing_optional.is_empty() {
        return WidgetStateInfo::partial_payload(&validation.missing_optional);
    }

    WidgetStateInfo::healthy(None)
}
