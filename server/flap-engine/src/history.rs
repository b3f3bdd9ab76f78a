//! Weighted rolling history for a single metric: bounded classification ring
//! plus running aggregates, updated in O(1) per sample.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::config::FlapConfig;
use crate::types::FlapState;

/// One retained classification, together with the aggregate contributions it
/// introduced at insertion (relative to its then-predecessor). Storing the
/// contributions makes eviction exact: removing the slot subtracts exactly
/// what it once added.
#[derive(Debug, Clone, Copy)]
struct Slot {
  above: bool,
  pair_weight: f64,
  flip_weight: f64,
}

/// Per-metric flap detection state. Owned exclusively by the engine; all
/// access is serialized under the metric's lock.
#[derive(Debug)]
pub struct SampleHistory {
  window: VecDeque<Slot>,
  /// Sum of every in-window slot's pair contribution.
  pair_weight_sum: f64,
  /// Sum of every in-window slot's flip contribution.
  flip_weight_sum: f64,
  pub(crate) state: FlapState,
  pub(crate) last_ratio: f64,
  pub(crate) total_samples: u64,
  pub(crate) first_seen: Option<DateTime<Utc>>,
  pub(crate) last_seen: Option<DateTime<Utc>>,
}

impl SampleHistory {
  pub fn new() -> Self {
    Self {
      window: VecDeque::new(),
      pair_weight_sum: 0.0,
      flip_weight_sum: 0.0,
      state: FlapState::NotFlapping,
      last_ratio: 0.0,
      total_samples: 0,
      first_seen: None,
      last_seen: None,
    }
  }

  /// Append one classification, evicting the oldest entries once the
  /// configured window is full.
  ///
  /// The new slot's contributions are taken against the previous newest
  /// sample: its own weight (`high_weight` when above, `low_weight` when
  /// below) counts toward the pair total, and toward the flip total only
  /// when the classification changed. The first sample after creation or
  /// reset has no predecessor and contributes nothing.
  pub fn observe(&mut self, above: bool, config: &FlapConfig, at: DateTime<Utc>) {
    // A zero window would retain nothing; clamp to one slot.
    let capacity = config.window_size.max(1);

    let weight = if above {
      config.high_weight
    } else {
      config.low_weight
    };
    let (pair_weight, flip_weight) = match self.window.back() {
      Some(prev) => (weight, if prev.above != above { weight } else { 0.0 }),
      None => (0.0, 0.0),
    };

    while self.window.len() >= capacity {
      match self.window.pop_front() {
        Some(evicted) => {
          self.pair_weight_sum -= evicted.pair_weight;
          self.flip_weight_sum -= evicted.flip_weight;
        }
        None => break,
      }
    }

    self.window.push_back(Slot {
      above,
      pair_weight,
      flip_weight,
    });
    self.pair_weight_sum += pair_weight;
    self.flip_weight_sum += flip_weight;

    if self.first_seen.is_none() {
      self.first_seen = Some(at);
    }
    self.last_seen = Some(at);
    self.total_samples += 1;
  }

  /// Weighted share of retained samples that flipped classification against
  /// their predecessor. Zero until two samples have been recorded, and never
  /// a division fault.
  pub fn flap_ratio(&self) -> f64 {
    if self.pair_weight_sum <= 0.0 {
      return 0.0;
    }
    (self.flip_weight_sum / self.pair_weight_sum).max(0.0)
  }

  pub fn len(&self) -> usize {
    self.window.len()
  }

  pub fn is_empty(&self) -> bool {
    self.window.is_empty()
  }

  /// Back to the initial state: empty window, zeroed aggregates, NOT_FLAPPING.
  pub fn clear(&mut self) {
    self.window.clear();
    self.pair_weight_sum = 0.0;
    self.flip_weight_sum = 0.0;
    self.state = FlapState::NotFlapping;
    self.last_ratio = 0.0;
    self.total_samples = 0;
    self.first_seen = None;
    self.last_seen = None;
  }
}

impl Default for SampleHistory {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;
  use chrono::TimeZone;
  use proptest::prelude::*;

  fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
  }

  /// Rescans a full classification sequence the way the engine's aggregates
  /// are supposed to behave: only the last `window_size` entries count, and
  /// each retained sample contributes its own weight, counting toward the
  /// flip sum only when it differed from the sample recorded just before it.
  fn naive_ratio(classes: &[bool], config: &FlapConfig) -> f64 {
    let capacity = config.window_size.max(1);
    let start = classes.len().saturating_sub(capacity);

    let mut flips = 0.0;
    let mut total = 0.0;
    for i in start..classes.len() {
      if i == 0 {
        continue; // the first sample ever recorded has no predecessor
      }
      let weight = if classes[i] {
        config.high_weight
      } else {
        config.low_weight
      };
      total += weight;
      if classes[i] != classes[i - 1] {
        flips += weight;
      }
    }
    if total <= 0.0 {
      0.0
    } else {
      flips / total
    }
  }

  #[test]
  fn empty_history_has_zero_ratio() {
    let history = SampleHistory::new();
    assert_eq!(history.flap_ratio(), 0.0);
    assert!(history.is_empty());
  }

  #[test]
  fn single_sample_has_zero_ratio() {
    let config = FlapConfig::default();
    let mut history = SampleHistory::new();
    history.observe(true, &config, ts());
    assert_eq!(history.flap_ratio(), 0.0);
    assert_eq!(history.len(), 1);
  }

  #[test]
  fn window_never_exceeds_capacity() {
    let config = FlapConfig {
      window_size: 10,
      ..FlapConfig::default()
    };
    let mut history = SampleHistory::new();
    for i in 0..100 {
      history.observe(i % 3 == 0, &config, ts());
      assert!(history.len() <= 10);
    }
    assert_eq!(history.len(), 10);
    assert_eq!(history.total_samples, 100);
  }

  #[test]
  fn identical_classifications_never_flip() {
    let config = FlapConfig::default();
    let mut history = SampleHistory::new();
    for _ in 0..20 {
      history.observe(false, &config, ts());
      assert_eq!(history.flap_ratio(), 0.0);
    }
  }

  #[test]
  fn alternating_full_window_ratio_is_one() {
    let config = FlapConfig::default();
    let mut history = SampleHistory::new();
    for i in 0..10 {
      history.observe(i % 2 == 0, &config, ts());
    }
    // Every in-window pair flips.
    assert_relative_eq!(history.flap_ratio(), 1.0);
  }

  #[test]
  fn ratio_tracks_rescan_through_evictions() {
    let config = FlapConfig {
      window_size: 5,
      low_weight: 0.8,
      high_weight: 1.2,
      ..FlapConfig::default()
    };
    let mut history = SampleHistory::new();
    let mut classes = Vec::new();
    // A deterministic but irregular pattern.
    for i in 0u32..200 {
      let above = (i * 7 + i / 3) % 5 < 2;
      classes.push(above);
      history.observe(above, &config, ts());
      assert_relative_eq!(
        history.flap_ratio(),
        naive_ratio(&classes, &config),
        epsilon = 1e-9
      );
    }
  }

  #[test]
  fn zero_weights_never_divide_by_zero() {
    let config = FlapConfig {
      low_weight: 0.0,
      high_weight: 0.0,
      ..FlapConfig::default()
    };
    let mut history = SampleHistory::new();
    for i in 0..20 {
      history.observe(i % 2 == 0, &config, ts());
    }
    assert_eq!(history.flap_ratio(), 0.0);
  }

  #[test]
  fn shrunken_window_evicts_down_on_next_observe() {
    let wide = FlapConfig {
      window_size: 10,
      ..FlapConfig::default()
    };
    let narrow = FlapConfig {
      window_size: 3,
      ..FlapConfig::default()
    };
    let mut history = SampleHistory::new();
    for _ in 0..10 {
      history.observe(false, &wide, ts());
    }
    assert_eq!(history.len(), 10);
    history.observe(true, &narrow, ts());
    assert_eq!(history.len(), 3);
  }

  #[test]
  fn clear_restores_initial_state() {
    let config = FlapConfig::default();
    let mut history = SampleHistory::new();
    for i in 0..15 {
      history.observe(i % 2 == 0, &config, ts());
    }
    history.state = FlapState::Flapping;

    history.clear();
    assert!(history.is_empty());
    assert_eq!(history.flap_ratio(), 0.0);
    assert_eq!(history.state, FlapState::NotFlapping);
    assert_eq!(history.total_samples, 0);
    assert!(history.first_seen.is_none());

    // Post-clear samples start a fresh pairing chain.
    history.observe(true, &config, ts());
    assert_eq!(history.flap_ratio(), 0.0);
  }

  proptest! {
    #[test]
    fn incremental_ratio_matches_rescan(
      classes in proptest::collection::vec(any::<bool>(), 0..300),
      window_size in 1usize..20,
      low_weight in 0.5f64..2.0,
      high_weight in 0.5f64..2.0,
    ) {
      let config = FlapConfig {
        window_size,
        low_weight,
        high_weight,
        ..FlapConfig::default()
      };
      let mut history = SampleHistory::new();
      for (i, &above) in classes.iter().enumerate() {
        history.observe(above, &config, ts());
        let expected = naive_ratio(&classes[..=i], &config);
        prop_assert!(
          (history.flap_ratio() - expected).abs() < 1e-9,
          "diverged at sample {}: incremental {} vs rescan {}",
          i,
          history.flap_ratio(),
          expected
        );
      }
    }
  }
}
