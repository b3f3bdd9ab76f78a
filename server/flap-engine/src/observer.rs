//! Observer seam for the surrounding alerting/reporting system.

use crate::types::Sample;

/// Receives flap transitions and steady-state notifications.
///
/// All methods default to no-ops so hosts implement only what they react to
/// (typically: suppress alerts on start, re-arm them on stop). Callbacks run
/// synchronously under the sampled metric's lock, so per-metric callback
/// order matches sample order; do not re-enter the engine for the same
/// metric from inside a callback.
pub trait FlapObserver: Send + Sync {
  /// The metric's flap ratio reached the start threshold.
  fn flapping_started(&self, _sample: &Sample) {}

  /// Flapping ceased while the triggering sample classified above threshold.
  fn above_threshold_flapping_stopped(&self, _sample: &Sample) {}

  /// Flapping ceased while the triggering sample classified below threshold.
  fn below_threshold_flapping_stopped(&self, _sample: &Sample) {}

  /// Steady-state hook: not flapping, sample above threshold.
  fn above_threshold_not_flapping(&self, _sample: &Sample) {}

  /// Steady-state hook: not flapping, sample below threshold.
  fn below_threshold_not_flapping(&self, _sample: &Sample) {}
}
