//! Flap Detection Engine — weighted rolling history + hysteresis thresholds.
//!
//! Watches continuously sampled metrics and decides whether a metric is
//! "flapping": oscillating across its alert threshold so rapidly that naive
//! alerting would produce a notification storm. One independent state
//! machine per metric name; each sample updates a bounded weighted history,
//! recomputes a flap ratio in O(1), and evaluates start/stop hysteresis
//! thresholds. Transitions surface as return values and observer callbacks.
//!
//! No DB, no network; pure computation + in-memory state.

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod observer;
pub mod types;

pub use config::{FlapConfig, StaticThresholds, ThresholdResolver};
pub use engine::FlapEngine;
pub use error::EngineError;
pub use observer::FlapObserver;
pub use types::{FlapSnapshot, FlapState, Notification, Sample, ThresholdSide, TransitionResult};
