//! Structured error types for the flap detection engine.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
  /// A sample arrived for a metric the resolver has no configuration for.
  /// Fatal to that call only; the sample is dropped and no history entry is
  /// created.
  #[error("no threshold configuration for metric: {metric}")]
  ConfigurationMissing { metric: String },

  /// A query for a metric that has never been sampled. Recoverable "no data".
  #[error("metric has never been sampled: {metric}")]
  UnknownMetric { metric: String },
}

impl EngineError {
  pub fn configuration_missing(metric: impl Into<String>) -> Self {
    Self::ConfigurationMissing {
      metric: metric.into(),
    }
  }

  pub fn unknown_metric(metric: impl Into<String>) -> Self {
    Self::UnknownMetric {
      metric: metric.into(),
    }
  }
}
