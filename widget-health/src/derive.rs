//! Health state derivation.
//!
//! One evaluation per widget per render cycle: fold the data-fetch
//! envelope (loading/error flags), any caller-supplied override, and the
//! bound sensors' liveness into a single [`WidgetStateInfo`]. Widget
//! kinds are rows in a rule table, so adding a kind is a data change,
//! not a new code branch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::state::{StateAction, WidgetStateInfo};
use crate::status::{default_failing_layer, FailingLayer, WidgetHealthStatus};

// ------------------------------------------------------------------ //
//  Thresholds                                                         //
// ------------------------------------------------------------------ //

/// Which upstream feeds a widget's data, for threshold selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCategory {
    Sensor,
    Gateway,
    External,
}

/// Staleness cutoffs for one data category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryThresholds {
    pub stale_minutes: i64,
    pub error_hours: i64,
}

/// Per-category staleness configuration.
#[derive(Debug, Clone, Copy)]
pub struct HealthThresholds {
    pub sensor: CategoryThresholds,
    pub gateway: CategoryThresholds,
    pub external: CategoryThresholds,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            sensor: CategoryThresholds { stale_minutes: 60, error_hours: 24 },
            gateway: CategoryThresholds { stale_minutes: 30, error_hours: 4 },
            external: CategoryThresholds { stale_minutes: 120, error_hours: 24 },
        }
    }
}

impl HealthThresholds {
    pub fn for_category(&self, category: DataCategory) -> CategoryThresholds {
        match category {
            DataCategory::Sensor => self.sensor,
            DataCategory::Gateway => self.gateway,
            DataCategory::External => self.external,
        }
    }
}

// ------------------------------------------------------------------ //
//  Widget rule table                                                  //
// ------------------------------------------------------------------ //

/// How a widget kind sources its data.
#[derive(Debug, Clone)]
pub enum WidgetScope {
    /// Backed by one bound sensor. `capabilities` lists the sensor types
    /// the kind accepts; empty means any sensor type.
    SingleSensor { capabilities: Vec<String> },
    /// Aggregates over every bound sensor.
    Fleet,
    /// Needs a site bound before it can show anything.
    SiteContext,
    /// No liveness source; empty-or-healthy only.
    Static,
}

/// Rule row for one widget kind.
#[derive(Debug, Clone)]
pub struct WidgetRules {
    pub category: DataCategory,
    pub scope: WidgetScope,
}

impl WidgetRules {
    fn single(category: DataCategory, capabilities: &[&str]) -> Self {
        Self {
            category,
            scope: WidgetScope::SingleSensor {
                capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
            },
        }
    }
}

// ------------------------------------------------------------------ //
//  Evaluation context                                                 //
// ------------------------------------------------------------------ //

/// A sensor bound to the widget, as reported by the liveness context.
#[derive(Debug, Clone)]
pub struct BoundSensor {
    pub sensor_type: String,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Everything the derivator needs about one widget for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct WidgetContext {
    pub is_loading: bool,
    /// Data-fetch error message, if the fetch failed.
    pub error: Option<String>,
    /// Pre-computed status supplied by the widget itself; used verbatim.
    pub status_override: Option<WidgetHealthStatus>,
    pub override_message: Option<String>,
    pub sensors: Vec<BoundSensor>,
    pub site_bound: bool,
    /// Number of rows in the widget's data array.
    pub data_points: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

// ------------------------------------------------------------------ //
//  Derivator                                                          //
// ------------------------------------------------------------------ //

/// Derives a [`WidgetStateInfo`] per widget kind per render cycle.
pub struct HealthDerivator {
    rules: HashMap<String, WidgetRules>,
    thresholds: HealthThresholds,
}

impl Default for HealthDerivator {
    fn default() -> Self {
        Self::builtin()
    }
}

impl HealthDerivator {
    /// Rule table for the built-in widget kinds.
    pub fn builtin() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            "temperature".to_string(),
            WidgetRules::single(DataCategory::Sensor, &["temperature", "temp_rh"]),
        );
        rules.insert(
            "humidity".to_string(),
            WidgetRules::single(DataCategory::Sensor, &["temp_rh", "air_quality"]),
        );
        rules.insert(
            "battery".to_string(),
            WidgetRules::single(DataCategory::Sensor, &[]),
        );
        rules.insert(
            "door_activity".to_string(),
            WidgetRules::single(DataCategory::Sensor, &["door", "contact"]),
        );
        rules.insert(
            "air_quality".to_string(),
            WidgetRules::single(DataCategory::Sensor, &["air_quality"]),
        );
        rules.insert(
            "signal_strength".to_string(),
            WidgetRules::single(DataCategory::Gateway, &[]),
        );
        rules.insert(
            "connected_sensors".to_string(),
            WidgetRules {
                category: DataCategory::Sensor,
                scope: WidgetScope::Fleet,
            },
        );
        rules.insert(
            "site_overview".to_string(),
            WidgetRules {
                category: DataCategory::Sensor,
                scope: WidgetScope::SiteContext,
            },
        );
        rules.insert(
            "weather".to_string(),
            WidgetRules {
                category: DataCategory::External,
                scope: WidgetScope::Static,
            },
        );
        rules.insert(
            "notes".to_string(),
            WidgetRules {
                category: DataCategory::Sensor,
                scope: WidgetScope::Static,
            },
        );
        Self {
            rules,
            thresholds: HealthThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Register or replace the rule row for a widget kind.
    pub fn register_kind(&mut self, kind: &str, rules: WidgetRules) {
        self.rules.insert(kind.to_string(), rules);
    }

    /// Derive the widget's state for this render cycle.
    pub fn evaluate(
        &self,
        kind: &str,
        ctx: &WidgetContext,
        now: DateTime<Utc>,
    ) -> WidgetStateInfo {
        let state = self.evaluate_inner(kind, ctx, now);
        debug!(kind, status = %state.status, "widget state derived");
        state
    }

    fn evaluate_inner(
        &self,
        kind: &str,
        ctx: &WidgetContext,
        now: DateTime<Utc>,
    ) -> WidgetStateInfo {
        if ctx.is_loading {
            return WidgetStateInfo::of(WidgetHealthStatus::Loading);
        }

        if let Some(error) = &ctx.error {
            return WidgetStateInfo::of(WidgetHealthStatus::Error)
                .with_root_cause(error)
                .with_action(StateAction::new("Retry").with_icon("refresh"));
        }

        if let Some(status) = ctx.status_override {
            let mut state = WidgetStateInfo::of(status);
            if let Some(message) = &ctx.override_message {
                state = state.with_message(message);
            }
            state.failing_layer = default_failing_layer(status);
            return state;
        }

        // Unknown kinds fall back to the static rule.
        let fallback = WidgetRules {
            category: DataCategory::Sensor,
            scope: WidgetScope::Static,
        };
        let rules = self.rules.get(kind).unwrap_or(&fallback);
        let thresholds = self.thresholds.for_category(rules.category);

        match &rules.scope {
            WidgetScope::SingleSensor { capabilities } => {
                self.evaluate_single_sensor(kind, capabilities, ctx, thresholds, now)
            }
            WidgetScope::Fleet => evaluate_fleet(ctx, thresholds, now),
            WidgetScope::SiteContext => {
                if !ctx.site_bound {
                    WidgetStateInfo::of(WidgetHealthStatus::NotConfigured)
                        .with_message("Select a site to show this widget")
                        .with_action(StateAction::new("Choose site").with_href("/sites"))
                } else {
                    evaluate_static(ctx)
                }
            }
            WidgetScope::Static => evaluate_static(ctx),
        }
    }

    fn evaluate_single_sensor(
        &self,
        kind: &str,
        capabilities: &[String],
        ctx: &WidgetContext,
        thresholds: CategoryThresholds,
        now: DateTime<Utc>,
    ) -> WidgetStateInfo {
        let sensor = match ctx.sensors.first() {
            Some(s) => s,
            None => {
                return WidgetStateInfo::of(WidgetHealthStatus::NotConfigured)
                    .with_message("No sensor assigned to this widget")
                    .with_action(StateAction::new("Assign sensor").with_href("/sensors"));
            }
        };

        if !capabilities.is_empty() && !capabilities.iter().any(|c| c == &sensor.sensor_type) {
            let expected = capabilities.first().map(String::as_str).unwrap_or(kind);
            return WidgetStateInfo::mismatch(expected, &sensor.sensor_type);
        }

        let last_seen = match sensor.last_seen {
            Some(t) => t,
            None => {
                return WidgetStateInfo::of(WidgetHealthStatus::NoData)
                    .with_root_cause("Sensor has never reported")
            }
        };

        let elapsed = now.signed_duration_since(last_seen);
        if elapsed.num_hours() >= thresholds.error_hours {
            let mut state = WidgetStateInfo::of(WidgetHealthStatus::Offline)
                .with_root_cause(&format!(
                    "Last reading received {} hours ago",
                    elapsed.num_hours()
                ))
                .with_action(StateAction::new("Check sensor").with_href("/sensors"));
            state.failing_layer = Some(FailingLayer::Sensor);
            state.last_updated = Some(last_seen);
            return state;
        }
        if elapsed.num_minutes() >= thresholds.stale_minutes {
            let mut state = WidgetStateInfo::of(WidgetHealthStatus::Stale).with_root_cause(
                &format!("Last reading received {} minutes ago", elapsed.num_minutes()),
            );
            state.last_updated = Some(last_seen);
            return state;
        }

        if ctx.data_points == 0 {
            return WidgetStateInfo::of(WidgetHealthStatus::Empty);
        }

        WidgetStateInfo::healthy(ctx.last_updated.or(Some(last_seen)))
    }
}

fn sensor_is_offline(sensor: &BoundSensor, thresholds: CategoryThresholds, now: DateTime<Utc>) -> bool {
    match sensor.last_seen {
        Some(t) => now.signed_duration_since(t).num_hours() >= thresholds.error_hours,
        None => true,
    }
}

fn evaluate_fleet(
    ctx: &WidgetContext,
    thresholds: CategoryThresholds,
    now: DateTime<Utc>,
) -> WidgetStateInfo {
    if ctx.sensors.is_empty() {
        return WidgetStateInfo::of(WidgetHealthStatus::NotConfigured)
            .with_message("No sensors connected")
            .with_action(StateAction::new("Add sensors").with_href("/sensors"));
    }

    let offline = ctx
        .sensors
        .iter()
        .filter(|s| sensor_is_offline(s, thresholds, now))
        .count();
    let total = ctx.sensors.len();

    if offline == total {
        let mut state = WidgetStateInfo::of(WidgetHealthStatus::Offline)
            .with_root_cause(&format!("All {total} sensors are offline"));
        state.failing_layer = Some(FailingLayer::Sensor);
        return state;
    }
    if offline > 0 {
        return WidgetStateInfo::of(WidgetHealthStatus::Stale)
            .with_root_cause(&format!("{offline} of {total} sensors are offline"));
    }
    WidgetStateInfo::healthy(ctx.last_updated)
}

fn evaluate_static(ctx: &WidgetContext) -> WidgetStateInfo {
    if ctx.data_points == 0 {
        WidgetStateInfo::of(WidgetHealthStatus::Empty)
    } else {
        WidgetStateInfo::healthy(ctx.last_updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn sensor(sensor_type: &str, seen_ago: Duration) -> BoundSensor {
        BoundSensor {
            sensor_type: sensor_type.to_string(),
            last_seen: Some(now() - seen_ago),
        }
    }

    fn ctx_with(sensors: Vec<BoundSensor>) -> WidgetContext {
        WidgetContext {
            sensors,
            data_points: 10,
            ..WidgetContext::default()
        }
    }

    #[test]
    fn loading_flag_is_terminal() {
        let ctx = WidgetContext {
            is_loading: true,
            error: Some("boom".to_string()),
            ..WidgetContext::default()
        };
        let state = HealthDerivator::builtin().evaluate("temperature", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Loading);
    }

    #[test]
    fn fetch_error_overrides_everything_below() {
        let ctx = WidgetContext {
            error: Some("connection refused".to_string()),
            sensors: vec![sensor("temperature", Duration::minutes(1))],
            data_points: 10,
            ..WidgetContext::default()
        };
        let state = HealthDerivator::builtin().evaluate("temperature", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Error);
        assert_eq!(state.root_cause.as_deref(), Some("connection refused"));
        assert_eq!(state.action.unwrap().label, "Retry");
    }

    #[test]
    fn status_override_is_used_verbatim_with_layer() {
        let ctx = WidgetContext {
            status_override: Some(WidgetHealthStatus::Offline),
            ..WidgetContext::default()
        };
        let state = HealthDerivator::builtin().evaluate("temperature", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Offline);
        assert_eq!(state.failing_layer, Some(FailingLayer::Sensor));
        assert_eq!(state.message, WidgetHealthStatus::Offline.default_message());
    }

    #[test]
    fn status_override_keeps_caller_message() {
        let ctx = WidgetContext {
            status_override: Some(WidgetHealthStatus::Degraded),
            override_message: Some("Battery curve looks wrong".to_string()),
            ..WidgetContext::default()
        };
        let state = HealthDerivator::builtin().evaluate("battery", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Degraded);
        assert_eq!(state.message, "Battery curve looks wrong");
    }

    #[test]
    fn unbound_sensor_widget_is_not_configured() {
        let state =
            HealthDerivator::builtin().evaluate("temperature", &WidgetContext::default(), now());
        assert_eq!(state.status, WidgetHealthStatus::NotConfigured);
        assert!(state.action.is_some());
    }

    #[test]
    fn door_widget_with_temperature_sensor_is_mismatch() {
        let ctx = ctx_with(vec![sensor("temperature", Duration::minutes(5))]);
        let state = HealthDerivator::builtin().evaluate("door_activity", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Mismatch);
        assert_eq!(state.failing_layer, Some(FailingLayer::Decoder));
        let cause = state.root_cause.unwrap();
        assert!(cause.contains("door"));
        assert!(cause.contains("temperature"));
    }

    #[test]
    fn door_widget_accepts_contact_sensor() {
        let ctx = ctx_with(vec![sensor("contact", Duration::minutes(5))]);
        let state = HealthDerivator::builtin().evaluate("door_activity", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Healthy);
    }

    #[test]
    fn never_seen_sensor_is_no_data() {
        let ctx = ctx_with(vec![BoundSensor {
            sensor_type: "temperature".to_string(),
            last_seen: None,
        }]);
        let state = HealthDerivator::builtin().evaluate("temperature", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::NoData);
    }

    #[test]
    fn sensor_offline_at_error_threshold() {
        let ctx = ctx_with(vec![sensor("temperature", Duration::hours(24))]);
        let state = HealthDerivator::builtin().evaluate("temperature", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Offline);
        assert_eq!(state.failing_layer, Some(FailingLayer::Sensor));
        assert!(state.last_updated.is_some());
    }

    #[test]
    fn sensor_stale_at_stale_threshold() {
        let ctx = ctx_with(vec![sensor("temperature", Duration::minutes(60))]);
        let state = HealthDerivator::builtin().evaluate("temperature", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Stale);
        assert!(state.failing_layer.is_none());
    }

    #[test]
    fn fresh_sensor_just_under_threshold_is_healthy() {
        let ctx = ctx_with(vec![sensor("temperature", Duration::minutes(59))]);
        let state = HealthDerivator::builtin().evaluate("temperature", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Healthy);
    }

    #[test]
    fn fresh_sensor_with_no_rows_is_empty() {
        let mut ctx = ctx_with(vec![sensor("temperature", Duration::minutes(1))]);
        ctx.data_points = 0;
        let state = HealthDerivator::builtin().evaluate("temperature", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Empty);
    }

    #[test]
    fn gateway_category_uses_tighter_thresholds() {
        // 30 minutes is stale for gateway-fed widgets, healthy for sensor-fed.
        let ctx = ctx_with(vec![sensor("gateway", Duration::minutes(30))]);
        let state = HealthDerivator::builtin().evaluate("signal_strength", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Stale);

        let ctx = ctx_with(vec![sensor("gateway", Duration::hours(4))]);
        let state = HealthDerivator::builtin().evaluate("signal_strength", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Offline);
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let thresholds = HealthThresholds {
            sensor: CategoryThresholds { stale_minutes: 5, error_hours: 1 },
            ..HealthThresholds::default()
        };
        let derivator = HealthDerivator::builtin().with_thresholds(thresholds);
        let ctx = ctx_with(vec![sensor("temperature", Duration::minutes(10))]);
        assert_eq!(
            derivator.evaluate("temperature", &ctx, now()).status,
            WidgetHealthStatus::Stale
        );
    }

    #[test]
    fn fleet_with_no_sensors_is_not_configured() {
        let state = HealthDerivator::builtin().evaluate(
            "connected_sensors",
            &WidgetContext::default(),
            now(),
        );
        assert_eq!(state.status, WidgetHealthStatus::NotConfigured);
    }

    #[test]
    fn fleet_all_offline_is_offline() {
        let ctx = ctx_with(vec![
            sensor("temperature", Duration::hours(25)),
            sensor("door", Duration::hours(30)),
        ]);
        let state = HealthDerivator::builtin().evaluate("connected_sensors", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Offline);
        assert_eq!(state.failing_layer, Some(FailingLayer::Sensor));
    }

    #[test]
    fn fleet_partially_offline_is_stale() {
        let ctx = ctx_with(vec![
            sensor("temperature", Duration::minutes(5)),
            sensor("door", Duration::hours(30)),
        ]);
        let state = HealthDerivator::builtin().evaluate("connected_sensors", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Stale);
        assert!(state.root_cause.unwrap().contains("1 of 2"));
    }

    #[test]
    fn fleet_all_fresh_is_healthy() {
        let ctx = ctx_with(vec![
            sensor("temperature", Duration::minutes(5)),
            sensor("door", Duration::minutes(2)),
        ]);
        let state = HealthDerivator::builtin().evaluate("connected_sensors", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Healthy);
    }

    #[test]
    fn site_widget_without_site_is_not_configured() {
        let state =
            HealthDerivator::builtin().evaluate("site_overview", &WidgetContext::default(), now());
        assert_eq!(state.status, WidgetHealthStatus::NotConfigured);
    }

    #[test]
    fn site_widget_with_site_and_data_is_healthy() {
        let ctx = WidgetContext {
            site_bound: true,
            data_points: 3,
            ..WidgetContext::default()
        };
        let state = HealthDerivator::builtin().evaluate("site_overview", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Healthy);
    }

    #[test]
    fn unknown_kind_falls_back_to_static_rule() {
        let state = HealthDerivator::builtin().evaluate(
            "brand_new_widget",
            &WidgetContext::default(),
            now(),
        );
        assert_eq!(state.status, WidgetHealthStatus::Empty);

        let ctx = WidgetContext {
            data_points: 1,
            ..WidgetContext::default()
        };
        let state = HealthDerivator::builtin().evaluate("brand_new_widget", &ctx, now());
        assert_eq!(state.status, WidgetHealthStatus::Healthy);
    }

    #[test]
    fn every_state_message_is_non_empty() {
        let derivator = HealthDerivator::builtin();
        let cases: Vec<WidgetContext> = vec![
            WidgetContext { is_loading: true, ..WidgetContext::default() },
            WidgetContext { error: Some("x".into()), ..WidgetContext::default() },
            WidgetContext::default(),
            ctx_with(vec![sensor("temperature", Duration::hours(48))]),
            ctx_with(vec![sensor("temperature", Duration::minutes(1))]),
        ];
        for ctx in &cases {
            let state = derivator.evaluate("temperature", ctx, now());
            assert!(!state.message.is_empty(), "{:?}", state.status);
        }
    }
}
