// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use rustc_hash::FxHashSet;
use tracing::debug;

/// When the front may stop early because target points were reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetReachedMode {
    /// Never stop on targets; march until the queue empties or the stopping
    /// value is exceeded.
    #[default]
    NoTargets,
    /// Stop after the first target becomes Alive.
    OneTarget,
    /// Stop after the given number of distinct targets became Alive.
    SomeTargets(usize),
    /// Stop after every in-bounds target became Alive.
    AllTargets,
}

/// Tracks target points and decides when marching ends.
///
/// Targets are flat indices; out-of-bounds targets must be filtered out
/// by the caller. Once the reached count meets the mode's threshold, the
/// arrival time of the node that met it is latched and never changes.
#[derive(Debug, Clone)]
pub struct TargetStop {
    mode: TargetReachedMode,
    offset: f64,
    targets: FxHashSet<usize>,
    reached: Vec<(usize, f64)>,
    reached_set: FxHashSet<usize>,
    threshold: Option<usize>,
    latched: Option<f64>,
    largest: Option<f64>,
}

impl TargetStop {
    /// Create a controller for `targets` (duplicates are merged).
    pub fn new(
        mode: TargetReachedMode,
        offset: f64,
        targets: impl IntoIterator<Item = usize>,
    ) -> Self {
        let targets: FxHashSet<usize> = targets.into_iter().collect();
        let threshold = match mode {
            TargetReachedMode::NoTargets => None,
            TargetReachedMode::OneTarget => Some(1),
            TargetReachedMode::SomeTargets(count) => Some(count),
            TargetReachedMode::AllTargets => Some(targets.len()),
        }
        .filter(|&t| t > 0);

        if let Some(t) = threshold {
            if t > targets.len() {
                debug!(
                    threshold = t,
                    targets = targets.len(),
                    "target threshold exceeds target count and will never be met"
                );
            }
        }

        TargetStop {
            mode,
            offset,
            targets,
            reached: Vec::new(),
            reached_set: FxHashSet::default(),
            threshold,
            latched: None,
            largest: None,
        }
    }

    /// Record that `flat` became Alive with arrival time `value`.
    pub fn on_alive(&mut self, flat: usize, value: f64) {
        self.largest = Some(self.largest.map_or(value, |l| l.max(value)));

        if !self.targets.contains(&flat) || !self.reached_set.insert(flat) {
            return;
        }
        self.reached.push((flat, value));

        if self.latched.is_none() && Some(self.reached.len()) == self.threshold {
            debug!(
                target_value = value,
                reached = self.reached.len(),
                offset = self.offset,
                "target condition met"
            );
            self.latched = Some(value);
        }
    }

    /// Whether the target condition has fired.
    pub fn is_latched(&self) -> bool {
        self.latched.is_some()
    }

    /// Largest admissible value for the next node to freeze.
    ///
    /// After latching this is `target value + offset`, replacing the plain
    /// stopping value.
    pub fn limit(&self, stopping_value: f64) -> f64 {
        match self.latched {
            Some(v) => v + self.offset,
            None => stopping_value,
        }
    }

    /// The latched target value, or for [`TargetReachedMode::NoTargets`] the
    /// largest arrival time produced so far.
    pub fn target_value(&self) -> Option<f64> {
        match self.mode {
            TargetReachedMode::NoTargets => self.largest,
            _ => self.latched,
        }
    }

    /// Reached targets as `(flat, arrival time)` in the order they were reached.
    pub fn reached(&self) -> &[(usize, f64)] {
        &self.reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_target_latches_once() {
        let mut stop = TargetStop::new(TargetReachedMode::OneTarget, 0.0, [3, 7, 9]);
        stop.on_alive(1, 0.5);
        assert!(!stop.is_latched());
        assert_eq!(stop.target_value(), None);

        stop.on_alive(7, 2.0);
        assert!(stop.is_latched());
        assert_eq!(stop.target_value(), Some(2.0));

        // Reaching more targets does not move the latched value.
        stop.on_alive(3, 2.5);
        stop.on_alive(9, 4.0);
        assert_eq!(stop.target_value(), Some(2.0));
        assert_eq!(stop.reached(), &[(7, 2.0), (3, 2.5), (9, 4.0)]);
    }

    #[test]
    fn some_targets_uses_nth_arrival() {
        let mut stop = TargetStop::new(TargetReachedMode::SomeTargets(2), 5.0, [10, 20, 30]);
        stop.on_alive(20, 1.0);
        assert!(!stop.is_latched());
        assert_eq!(stop.limit(100.0), 100.0);

        stop.on_alive(30, 3.0);
        assert_eq!(stop.target_value(), Some(3.0));
        assert_eq!(stop.limit(100.0), 8.0);
    }

    #[test]
    fn limit_replaces_stopping_value_after_latch() {
        let mut stop = TargetStop::new(TargetReachedMode::OneTarget, 10.0, [4]);
        stop.on_alive(4, 5.0);
        // The offset may extend past a smaller stopping value.
        assert_eq!(stop.limit(7.0), 15.0);
    }

    #[test]
    fn duplicate_reach_is_counted_once() {
        let mut stop = TargetStop::new(TargetReachedMode::SomeTargets(2), 0.0, [1, 2]);
        stop.on_alive(1, 1.0);
        stop.on_alive(1, 1.0);
        assert!(!stop.is_latched());
        assert_eq!(stop.reached().len(), 1);
    }

    #[test]
    fn all_targets_merges_duplicates() {
        let mut stop = TargetStop::new(TargetReachedMode::AllTargets, 0.0, [5, 5, 6]);
        stop.on_alive(5, 1.0);
        assert!(!stop.is_latched());
        stop.on_alive(6, 2.0);
        assert_eq!(stop.target_value(), Some(2.0));
    }

    #[test]
    fn unreachable_thresholds_never_latch() {
        let mut too_many = TargetStop::new(TargetReachedMode::SomeTargets(4), 0.0, [1, 2]);
        let mut zero = TargetStop::new(TargetReachedMode::SomeTargets(0), 0.0, [1, 2]);
        let mut empty = TargetStop::new(TargetReachedMode::AllTargets, 0.0, std::iter::empty());
        for (flat, value) in [(1, 1.0), (2, 2.0), (3, 3.0)] {
            too_many.on_alive(flat, value);
            zero.on_alive(flat, value);
            empty.on_alive(flat, value);
        }
        for stop in [&too_many, &zero, &empty] {
            assert!(!stop.is_latched());
            assert_eq!(stop.limit(42.0), 42.0);
            assert_eq!(stop.target_value(), None);
        }
        assert_eq!(too_many.reached().len(), 2);
    }

    #[test]
    fn no_targets_reports_largest_value() {
        let mut stop = TargetStop::new(TargetReachedMode::NoTargets, 0.0, [2]);
        assert_eq!(stop.target_value(), None);
        stop.on_alive(0, 4.0);
        stop.on_alive(1, 1.0);
        stop.on_alive(2, 6.0);
        assert_eq!(stop.target_value(), Some(6.0));
        assert!(!stop.is_latched());
        // Targets are still recorded for reporting.
        assert_eq!(stop.reached(), &[(2, 6.0)]);
    }
}
