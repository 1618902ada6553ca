//! Widget state snapshots and helper constructors.
//!
//! A [`WidgetStateInfo`] is created fresh on every evaluation and lives
//! for the render cycle that consumes it. The helper constructors cover
//! the pipeline-failure states whose layer attribution is fixed by
//! contract rather than looked up in the default table.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::status::{FailingLayer, WidgetHealthStatus};

// ------------------------------------------------------------------ //
//  Types                                                              //
// ------------------------------------------------------------------ //

/// Inert descriptor for a remedial action the UI layer may offer.
///
/// The engine never executes actions; it only describes them.
#[derive(Debug, Clone, Serialize)]
pub struct StateAction {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl StateAction {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            href: None,
            icon: None,
        }
    }

    pub fn with_href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }
}

/// Snapshot of a widget's health for one render cycle.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetStateInfo {
    pub status: WidgetHealthStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<StateAction>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_layer: Option<FailingLayer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_details: Option<String>,
}

// ------------------------------------------------------------------ //
//  Constructors                                                       //
// ------------------------------------------------------------------ //

impl WidgetStateInfo {
    /// A state carrying only the status and its default message.
    pub fn of(status: WidgetHealthStatus) -> Self {
        Self {
            status,
            message: status.default_message().to_string(),
            root_cause: None,
            action: None,
            last_updated: None,
            failing_layer: None,
            technical_details: None,
        }
    }

    pub fn healthy(last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            last_updated,
            ..Self::of(WidgetHealthStatus::Healthy)
        }
    }

    /// The decoder labelled the payload differently than the widget expects.
    pub fn mismatch(expected_type: &str, received_type: &str) -> Self {
        Self {
            root_cause: Some(format!(
                "Expected {expected_type} payload but received {received_type}"
            )),
            failing_layer: Some(FailingLayer::Decoder),
            ..Self::of(WidgetHealthStatus::Mismatch)
        }
    }

    /// Required fields were missing from the delivered payload.
    pub fn schema_failed(missing_required: &[String]) -> Self {
        Self {
            root_cause: Some(format!(
                "Missing required field(s): {}",
                missing_required.join(", ")
            )),
            failing_layer: Some(FailingLayer::Webhook),
            ..Self::of(WidgetHealthStatus::SchemaFailed)
        }
    }

    /// Optional fields were missing; data is usable but incomplete.
    pub fn partial_payload(missing_optional: &[String]) -> Self {
        Self {
            root_cause: Some(format!(
                "Missing optional field(s): {}",
                missing_optional.join(", ")
            )),
            failing_layer: Some(FailingLayer::Decoder),
            ..Self::of(WidgetHealthStatus::PartialPayload)
        }
    }

    /// The decoder itself reported a failure.
    pub fn decoder_error(raw_message: &str) -> Self {
        Self {
            root_cause: Some(raw_message.to_string()),
            failing_layer: Some(FailingLayer::Decoder),
            ..Self::of(WidgetHealthStatus::DecoderError)
        }
    }

    /// Readings were stored in non-chronological order.
    pub fn out_of_order() -> Self {
        Self {
            root_cause: Some(
                "Readings did not arrive in chronological order".to_string(),
            ),
            failing_layer: Some(FailingLayer::Database),
            ..Self::of(WidgetHealthStatus::OutOfOrder)
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    pub fn with_root_cause(mut self, root_cause: &str) -> Self {
        self.root_cause = Some(root_cause.to_string());
        self
    }

    pub fn with_action(mut self, action: StateAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_technical_details(mut self, details: &str) -> Self {
        self.technical_details = Some(details.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_fixes_layer_and_message() {
        let state = WidgetStateInfo::mismatch("door", "temperature");
        assert_eq!(state.status, WidgetHealthStatus::Mismatch);
        assert_eq!(state.message, "Payload type mismatch");
        assert_eq!(state.failing_layer, Some(FailingLayer::Decoder));
        let cause = state.root_cause.unwrap();
        assert!(cause.contains("door"));
        assert!(cause.contains("temperature"));
    }

    #[test]
    fn schema_failed_lists_missing_fields() {
        let missing = vec!["temperature".to_string(), "humidity".to_string()];
        let state = WidgetStateInfo::schema_failed(&missing);
        assert_eq!(state.status, WidgetHealthStatus::SchemaFailed);
        assert_eq!(state.failing_layer, Some(FailingLayer::Webhook));
        assert!(state.root_cause.unwrap().contains("temperature, humidity"));
    }

    #[test]
    fn partial_payload_implicates_decoder() {
        let state = WidgetStateInfo::partial_payload(&["battery_level".to_string()]);
        assert_eq!(state.status, WidgetHealthStatus::PartialPayload);
        assert_eq!(state.failing_layer, Some(FailingLayer::Decoder));
    }

    #[test]
    fn decoder_error_preserves_raw_message() {
        let state = WidgetStateInfo::decoder_error("index out of range in bytes[12]");
        assert_eq!(state.status, WidgetHealthStatus::DecoderError);
        assert_eq!(state.failing_layer, Some(FailingLayer::Decoder));
        assert_eq!(
            state.root_cause.as_deref(),
            Some("index out of range in bytes[12]")
        );
    }

    #[test]
    fn out_of_order_implicates_database() {
        let state = WidgetStateInfo::out_of_order();
        assert_eq!(state.status, WidgetHealthStatus::OutOfOrder);
        assert_eq!(state.failing_layer, Some(FailingLayer::Database));
        assert!(state.root_cause.unwrap().contains("chronological"));
    }

    #[test]
    fn every_constructor_sets_a_message() {
        assert!(!WidgetStateInfo::healthy(None).message.is_empty());
        assert!(!WidgetStateInfo::mismatch("a", "b").message.is_empty());
        assert!(!WidgetStateInfo::out_of_order().message.is_empty());
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let json = serde_json::to_value(WidgetStateInfo::healthy(None)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(json.get("root_cause").is_none());
        assert!(json.get("failing_layer").is_none());
    }
}
