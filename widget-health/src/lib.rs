//! Widget health state engine.
//!
//! Takes already-fetched widget data plus sensor liveness context and
//! derives, per render cycle, what state the widget is in and which
//! pipeline layer (sensor → gateway → network server → decoder → webhook
//! → database) is implicated when it is unhealthy. Health transitions
//! feed a per-organization metrics aggregator.
//!
//! Nothing here performs I/O; every function is a pure computation over
//! inputs the caller has already fetched.

pub mod classify;
pub mod derive;
pub mod metrics;
pub mod ordering;
pub mod state;
pub mod status;

pub use classify::classify_payload;
pub use derive::{
    BoundSensor, CategoryThresholds, DataCategory, HealthDerivator, HealthThresholds,
    WidgetContext, WidgetRules, WidgetScope,
};
pub use metrics::{HealthChangeEvent, HealthMetrics};
pub use ordering::{detect_out_of_order, Recorded};
pub use state::{StateAction, WidgetStateInfo};
pub use status::{default_failing_layer, FailingLayer, WidgetHealthStatus};
