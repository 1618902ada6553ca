//! Per-organization health metrics aggregation.
//!
//! Counters are adjusted on each transition (decrement previous,
//! increment current), never recomputed, so the distribution always sums
//! to the number of widgets with a tracked status. The store is
//! constructor-owned: one instance per process, one per test, no
//! module-level singleton.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::status::{FailingLayer, WidgetHealthStatus};

/// Most recent events retained per organization.
const EVENT_BUFFER_CAPACITY: usize = 50;

// ------------------------------------------------------------------ //
//  Types                                                              //
// ------------------------------------------------------------------ //

/// One observed health transition of one widget.
#[derive(Debug, Clone, Serialize)]
pub struct HealthChangeEvent {
    pub widget_id: Uuid,
    pub entity_id: String,
    pub entity_type: String,
    pub org_id: String,
    pub previous_status: Option<WidgetHealthStatus>,
    pub current_status: WidgetHealthStatus,
    pub failing_layer: Option<FailingLayer>,
    pub payload_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct OrgHealthCounters {
    distribution: BTreeMap<WidgetHealthStatus, u64>,
    layer_counts: BTreeMap<FailingLayer, u64>,
    recent_events: VecDeque<HealthChangeEvent>,
    /// Layer recorded for each tracked widget at its last transition,
    /// needed to reverse the layer count when the widget moves on.
    last_layer: HashMap<(Uuid, String), Option<FailingLayer>>,
}

// ------------------------------------------------------------------ //
//  Aggregator                                                         //
// ------------------------------------------------------------------ //

/// Process-wide health metrics store, keyed by organization.
#[derive(Debug, Default)]
pub struct HealthMetrics {
    orgs: HashMap<String, OrgHealthCounters>,
}

impl HealthMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one health transition.
    ///
    /// The decrement/increment pair runs without yielding, so a caller
    /// interleaving further calls in the same tick never observes a torn
    /// distribution.
    pub fn track_health_change(&mut self, event: HealthChangeEvent) {
        let org = self.orgs.entry(event.org_id.clone()).or_default();
        let widget_key = (event.widget_id, event.entity_id.clone());

        if let Some(previous) = event.previous_status {
            decrement(&mut org.distribution, previous);
            if let Some(Some(previous_layer)) = org.last_layer.get(&widget_key) {
                decrement(&mut org.layer_counts, *previous_layer);
            }
        }

        *org.distribution.entry(event.current_status).or_insert(0) += 1;
        if let Some(layer) = event.failing_layer {
            *org.layer_counts.entry(layer).or_insert(0) += 1;
        }
        org.last_layer.insert(widget_key, event.failing_layer);

        if event.current_status.is_critical() {
            warn!(
                org_id = %event.org_id,
                widget_id = %event.widget_id,
                status = %event.current_status,
                layer = event.failing_layer.map(|l| l.as_str()),
                "critical widget health transition"
            );
        } else {
            info!(
                org_id = %event.org_id,
                widget_id = %event.widget_id,
                previous = event.previous_status.map(|s| s.as_str()),
                status = %event.current_status,
                "widget health transition"
            );
        }

        org.recent_events.push_back(event);
        while org.recent_events.len() > EVENT_BUFFER_CAPACITY {
            org.recent_events.pop_front();
        }
    }

    /// Snapshot of the status distribution. Zero counts are omitted.
    pub fn get_health_distribution(&self, org_id: &str) -> BTreeMap<WidgetHealthStatus, u64> {
        self.orgs
            .get(org_id)
            .map(|org| {
                org.distribution
                    .iter()
                    .filter(|(_, &count)| count > 0)
                    .map(|(&status, &count)| (status, count))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Snapshot of failure counts per pipeline layer.
    pub fn get_failures_by_layer(&self, org_id: &str) -> BTreeMap<FailingLayer, u64> {
        self.orgs
            .get(org_id)
            .map(|org| {
                org.layer_counts
                    .iter()
                    .filter(|(_, &count)| count > 0)
                    .map(|(&layer, &count)| (layer, count))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Buffered events in insertion order, newest last.
    pub fn get_buffered_events(&self, org_id: &str) -> Vec<HealthChangeEvent> {
        self.orgs
            .get(org_id)
            .map(|org| org.recent_events.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True while any widget in the org sits in a critical status.
    pub fn has_critical_issues(&self, org_id: &str) -> bool {
        self.orgs.get(org_id).is_some_and(|org| {
            org.distribution
                .iter()
                .any(|(status, &count)| status.is_critical() && count > 0)
        })
    }

    /// Discard all state for one organization.
    pub fn reset_org_counters(&mut self, org_id: &str) {
        self.orgs.remove(org_id);
    }

    /// Discard all state for every organization.
    pub fn clear_all_counters(&mut self) {
        self.orgs.clear();
    }
}

fn decrement<K: Ord>(counts: &mut BTreeMap<K, u64>, key: K) {
    if let Some(count) = counts.get_mut(&key) {
        *count = count.saturating_sub(1);
    }
}
