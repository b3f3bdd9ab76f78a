//! Core types for the flap engine (samples in, results and snapshots out).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Samples (what the collector feeds in)
// ---------------------------------------------------------------------------

/// One collected data point for a metric.
///
/// Only `current` participates in classification; `previous` and
/// `collected_at` ride along for observers and display.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
  pub metric: String,
  pub previous: f64,
  pub current: f64,
  pub collected_at: DateTime<Utc>,
}

impl Sample {
  pub fn new(
    metric: impl Into<String>,
    previous: f64,
    current: f64,
    collected_at: DateTime<Utc>,
  ) -> Self {
    Self {
      metric: metric.into(),
      previous,
      current,
      collected_at,
    }
  }

  /// A sample stamped with the current wall clock.
  pub fn now(metric: impl Into<String>, previous: f64, current: f64) -> Self {
    Self::new(metric, previous, current, Utc::now())
  }
}

// ---------------------------------------------------------------------------
// Detector state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlapState {
  NotFlapping,
  Flapping,
}

impl FlapState {
  pub fn is_flapping(self) -> bool {
    self == Self::Flapping
  }
}

/// Which side of the threshold a sample classified on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSide {
  Above,
  Below,
}

// ---------------------------------------------------------------------------
// Notifications (which callback a sample produced, if any)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
  FlappingStarted,
  AboveThresholdFlappingStopped,
  BelowThresholdFlappingStopped,
  AboveThresholdNotFlapping,
  BelowThresholdNotFlapping,
}

impl Notification {
  /// Transitions change the declared state; the not-flapping pair are
  /// advisory steady-state hooks.
  pub fn is_transition(self) -> bool {
    matches!(
      self,
      Self::FlappingStarted
        | Self::AboveThresholdFlappingStopped
        | Self::BelowThresholdFlappingStopped
    )
  }
}

// ---------------------------------------------------------------------------
// Per-sample result
// ---------------------------------------------------------------------------

/// Outcome of recording one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionResult {
  /// Declared state after this sample.
  pub state: FlapState,
  /// Flap ratio computed over the window including this sample.
  pub flap_ratio: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notification: Option<Notification>,
}

impl TransitionResult {
  /// Did this sample trip the FLAPPING transition?
  pub fn started(&self) -> bool {
    matches!(self.notification, Some(Notification::FlappingStarted))
  }

  /// Did this sample end a flap, and on which side of the threshold?
  pub fn stopped(&self) -> Option<ThresholdSide> {
    match self.notification {
      Some(Notification::AboveThresholdFlappingStopped) => Some(ThresholdSide::Above),
      Some(Notification::BelowThresholdFlappingStopped) => Some(ThresholdSide::Below),
      _ => None,
    }
  }
}

// ---------------------------------------------------------------------------
// Display snapshot (JSON contract — what a dashboard renders)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FlapSnapshot {
  pub metric: String,
  pub state: FlapState,
  /// Last computed flap ratio (0 until two samples have been recorded).
  pub flap_ratio: f64,
  /// Samples currently retained (bounded by the configured window size).
  pub window_len: usize,
  pub total_samples: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_seen: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_seen: Option<DateTime<Utc>>,
}
