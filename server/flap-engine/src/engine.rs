//! Core engine: one independent flap state machine per metric name.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::{FlapConfig, StaticThresholds, ThresholdResolver};
use crate::error::EngineError;
use crate::history::SampleHistory;
use crate::observer::FlapObserver;
use crate::types::{FlapSnapshot, FlapState, Notification, Sample, TransitionResult};

/// The flap detection engine. Holds in-memory state per metric name.
///
/// Samples for the same metric serialize on that metric's lock; samples for
/// different metrics proceed concurrently. Entries are created lazily on the
/// first configured sample and live until the engine is dropped.
pub struct FlapEngine<R: ThresholdResolver = StaticThresholds> {
  resolver: R,
  metrics: DashMap<String, Arc<Mutex<SampleHistory>>>,
  observers: Vec<Arc<dyn FlapObserver>>,
}

impl FlapEngine<StaticThresholds> {
  /// An engine backed by explicit `configure` calls.
  pub fn new() -> Self {
    Self::with_resolver(StaticThresholds::new())
  }

  /// Register or replace the threshold configuration for a metric. May be
  /// called before or interleaved with sampling.
  pub fn configure(&self, metric: impl Into<String>, config: FlapConfig) {
    self.resolver.set(metric, config);
  }
}

impl Default for FlapEngine<StaticThresholds> {
  fn default() -> Self {
    Self::new()
  }
}

impl<R: ThresholdResolver> FlapEngine<R> {
  /// An engine that looks thresholds up through the supplied resolver.
  pub fn with_resolver(resolver: R) -> Self {
    Self {
      resolver,
      metrics: DashMap::new(),
      observers: Vec::new(),
    }
  }

  /// Register an observer for transition and steady-state callbacks.
  pub fn add_observer(&mut self, observer: Arc<dyn FlapObserver>) {
    self.observers.push(observer);
  }

  /// Record one sample, stamped with the current wall clock.
  pub fn record_sample(
    &self,
    metric: &str,
    previous: f64,
    current: f64,
  ) -> Result<TransitionResult, EngineError> {
    self.record(Sample::now(metric, previous, current))
  }

  /// Record one sample for its metric.
  ///
  /// Classifies the current value against the resolved threshold, updates
  /// the metric's weighted history, and evaluates the hysteresis transition
  /// rules. Exactly one notification fires per sample unless the metric is
  /// flapping and stays flapping.
  pub fn record(&self, sample: Sample) -> Result<TransitionResult, EngineError> {
    // Resolve before touching the registry: an unconfigured sample must
    // leave no residual history entry.
    let config = self
      .resolver
      .resolve(&sample.metric)
      .ok_or_else(|| EngineError::configuration_missing(&sample.metric))?;

    let above = sample.current > config.threshold;

    // Clone the entry's Arc and release the map guard so samples for other
    // metrics never wait on this one, even within a registry shard.
    let slot = self
      .metrics
      .entry(sample.metric.clone())
      .or_insert_with(|| Arc::new(Mutex::new(SampleHistory::new())))
      .value()
      .clone();

    let mut history = slot.lock();
    history.observe(above, &config, sample.collected_at);
    let flap_ratio = history.flap_ratio();

    let notification = match history.state {
      FlapState::NotFlapping if flap_ratio >= config.start_ratio => {
        history.state = FlapState::Flapping;
        Some(Notification::FlappingStarted)
      }
      FlapState::Flapping if flap_ratio <= config.stop_ratio => {
        history.state = FlapState::NotFlapping;
        Some(if above {
          Notification::AboveThresholdFlappingStopped
        } else {
          Notification::BelowThresholdFlappingStopped
        })
      }
      FlapState::NotFlapping => Some(if above {
        Notification::AboveThresholdNotFlapping
      } else {
        Notification::BelowThresholdNotFlapping
      }),
      FlapState::Flapping => None,
    };
    history.last_ratio = flap_ratio;
    let state = history.state;

    // Dispatch under the metric's lock: callback order matches sample order.
    if let Some(notification) = notification {
      self.notify(notification, &sample);
    }
    drop(history);

    Ok(TransitionResult {
      state,
      flap_ratio,
      notification,
    })
  }

  /// Clear history and state for every tracked metric. Configuration is
  /// untouched; entries stay registered.
  pub fn reset(&self) {
    for entry in self.metrics.iter() {
      entry.value().lock().clear();
    }
  }

  /// Clear history and state for one metric; a no-op for untracked names.
  pub fn reset_metric(&self, metric: &str) {
    let slot = self.metrics.get(metric).map(|entry| entry.value().clone());
    if let Some(slot) = slot {
      slot.lock().clear();
    }
  }

  /// Read-only snapshot of one metric for display.
  pub fn snapshot(&self, metric: &str) -> Result<FlapSnapshot, EngineError> {
    let slot = self
      .metrics
      .get(metric)
      .map(|entry| entry.value().clone())
      .ok_or_else(|| EngineError::unknown_metric(metric))?;

    let history = slot.lock();
    Ok(FlapSnapshot {
      metric: metric.to_string(),
      state: history.state,
      flap_ratio: history.last_ratio,
      window_len: history.len(),
      total_samples: history.total_samples,
      first_seen: history.first_seen,
      last_seen: history.last_seen,
    })
  }

  /// Current declared state of one metric.
  pub fn state(&self, metric: &str) -> Result<FlapState, EngineError> {
    self.snapshot(metric).map(|snapshot| snapshot.state)
  }

  fn notify(&self, notification: Notification, sample: &Sample) {
    for observer in &self.observers {
      match notification {
        Notification::FlappingStarted => observer.flapping_started(sample),
        Notification::AboveThresholdFlappingStopped => {
          observer.above_threshold_flapping_stopped(sample)
        }
        Notification::BelowThresholdFlappingStopped => {
          observer.below_threshold_flapping_stopped(sample)
        }
        Notification::AboveThresholdNotFlapping => observer.above_threshold_not_flapping(sample),
        Notification::BelowThresholdNotFlapping => observer.below_threshold_not_flapping(sample),
      }
    }
  }
}
