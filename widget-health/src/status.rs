//! Shared status and pipeline-layer vocabulary.
//!
//! Both enumerations are closed: every function that dispatches on them
//! matches exhaustively, so adding a variant fails the build until every
//! table is updated.

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------ //
//  WidgetHealthStatus                                                 //
// ------------------------------------------------------------------ //

/// Health state of a single widget for one render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetHealthStatus {
    Healthy,
    Degraded,
    Stale,
    Error,
    NoData,
    Misconfigured,
    PermissionDenied,
    NotConfigured,
    Loading,
    Empty,
    Offline,
    Mismatch,
    DecoderError,
    SchemaFailed,
    PartialPayload,
    OutOfOrder,
}

impl WidgetHealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Stale => "stale",
            Self::Error => "error",
            Self::NoData => "no_data",
            Self::Misconfigured => "misconfigured",
            Self::PermissionDenied => "permission_denied",
            Self::NotConfigured => "not_configured",
            Self::Loading => "loading",
            Self::Empty => "empty",
            Self::Offline => "offline",
            Self::Mismatch => "mismatch",
            Self::DecoderError => "decoder_error",
            Self::SchemaFailed => "schema_failed",
            Self::PartialPayload => "partial_payload",
            Self::OutOfOrder => "out_of_order",
        }
    }

    /// Default user-facing message for the status.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Healthy => "Data is up to date",
            Self::Degraded => "Data quality is degraded",
            Self::Stale => "Data has not updated recently",
            Self::Error => "Failed to load data",
            Self::NoData => "No data received yet",
            Self::Misconfigured => "Widget is misconfigured",
            Self::PermissionDenied => "You do not have access to this data",
            Self::NotConfigured => "Widget is not configured",
            Self::Loading => "Loading…",
            Self::Empty => "No data for the selected period",
            Self::Offline => "Sensor appears to be offline",
            Self::Mismatch => "Payload type mismatch",
            Self::DecoderError => "Decoder reported an error",
            Self::SchemaFailed => "Payload failed schema validation",
            Self::PartialPayload => "Payload is missing optional fields",
            Self::OutOfOrder => "Readings arrived out of order",
        }
    }

    /// Statuses that make an organization's health critical.
    ///
    /// Stale, degraded, mismatch and partial_payload are warnings only.
    pub fn is_critical(self) -> bool {
        match self {
            Self::Error | Self::Offline | Self::DecoderError | Self::SchemaFailed => true,
            Self::Healthy
            | Self::Degraded
            | Self::Stale
            | Self::NoData
            | Self::Misconfigured
            | Self::PermissionDenied
            | Self::NotConfigured
            | Self::Loading
            | Self::Empty
            | Self::Mismatch
            | Self::PartialPayload
            | Self::OutOfOrder => false,
        }
    }
}

impl std::fmt::Display for WidgetHealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ------------------------------------------------------------------ //
//  FailingLayer                                                       //
// ------------------------------------------------------------------ //

/// Pipeline stage implicated as the likely cause of an unhealthy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailingLayer {
    Sensor,
    Gateway,
    Ttn,
    Decoder,
    Webhook,
    Database,
    ExternalApi,
}

impl FailingLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Gateway => "gateway",
            Self::Ttn => "ttn",
            Self::Decoder => "decoder",
            Self::Webhook => "webhook",
            Self::Database => "database",
            Self::ExternalApi => "external_api",
        }
    }
}

impl std::fmt::Display for FailingLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ------------------------------------------------------------------ //
//  Status → layer table                                               //
// ------------------------------------------------------------------ //

/// Default pipeline layer implicated by a status.
///
/// States produced by an explicit helper constructor carry their layer
/// already fixed; this table is the fallback for plain statuses.
pub fn default_failing_layer(status: WidgetHealthStatus) -> Option<FailingLayer> {
    match status {
        WidgetHealthStatus::Offline => Some(FailingLayer::Sensor),
        WidgetHealthStatus::Mismatch
        | WidgetHealthStatus::DecoderError
        | WidgetHealthStatus::PartialPayload => Some(FailingLayer::Decoder),
        WidgetHealthStatus::SchemaFailed => Some(FailingLayer::Webhook),
        WidgetHealthStatus::OutOfOrder => Some(FailingLayer::Database),
        WidgetHealthStatus::Healthy
        | WidgetHealthStatus::Degraded
        | WidgetHealthStatus::Stale
        | WidgetHealthStatus::Error
        | WidgetHealthStatus::NoData
        | WidgetHealthStatus::Misconfigured
        | WidgetHealthStatus::PermissionDenied
        | WidgetHealthStatus::NotConfigured
        | WidgetHealthStatus::Loading
        | WidgetHealthStatus::Empty => None,
    }
}
