//! Threshold configuration and the resolver seam the engine depends on.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Tunable thresholds and weights for one metric's flap detection.
///
/// `start_ratio` and `stop_ratio` are independent comparison points; the
/// engine does not require any ordering between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlapConfig {
  /// Value boundary separating "above" from "below" classification.
  pub threshold: f64,
  /// Number of most-recent samples retained per metric.
  pub window_size: usize,
  /// Flap ratio at or above which NOT_FLAPPING transitions to FLAPPING.
  pub start_ratio: f64,
  /// Flap ratio at or below which FLAPPING transitions back to NOT_FLAPPING.
  pub stop_ratio: f64,
  /// Weight of a below-threshold sample in the flap ratio.
  pub low_weight: f64,
  /// Weight of an above-threshold sample in the flap ratio.
  pub high_weight: f64,
}

impl Default for FlapConfig {
  fn default() -> Self {
    Self {
      threshold: 0.0,
      window_size: 10,
      start_ratio: 0.29,
      stop_ratio: 0.49,
      low_weight: 1.0,
      high_weight: 1.0,
    }
  }
}

impl FlapConfig {
  /// Default detection parameters around a caller-supplied threshold.
  pub fn with_threshold(threshold: f64) -> Self {
    Self {
      threshold,
      ..Self::default()
    }
  }
}

/// Supplies the threshold configuration for a metric name at sample time.
///
/// Hosts with their own config subsystem implement this (or pass a closure);
/// everyone else uses [`StaticThresholds`] via `FlapEngine::configure`.
pub trait ThresholdResolver: Send + Sync {
  fn resolve(&self, metric: &str) -> Option<FlapConfig>;
}

impl<F> ThresholdResolver for F
where
  F: Fn(&str) -> Option<FlapConfig> + Send + Sync,
{
  fn resolve(&self, metric: &str) -> Option<FlapConfig> {
    self(metric)
  }
}

/// Map-backed resolver: explicit `set` calls, replaceable at any time.
#[derive(Debug, Default)]
pub struct StaticThresholds {
  configs: DashMap<String, FlapConfig>,
}

impl StaticThresholds {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register or replace the configuration for a metric.
  pub fn set(&self, metric: impl Into<String>, config: FlapConfig) {
    self.configs.insert(metric.into(), config);
  }

  /// Remove a metric's configuration, returning it if present.
  pub fn remove(&self, metric: &str) -> Option<FlapConfig> {
    self.configs.remove(metric).map(|(_, config)| config)
  }
}

impl ThresholdResolver for StaticThresholds {
  fn resolve(&self, metric: &str) -> Option<FlapConfig> {
    self.configs.get(metric).map(|entry| entry.value().clone())
  }
}
