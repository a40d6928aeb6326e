//! Progress aggregation — maps multi-phase raw progress onto one monotonic scale.
//!
//! Each workload has phases with independent, non-uniform completion signals
//! (artifact download percentage vs. encode percentage vs. stage ticks).
//! Phase `k` of `n` maps onto the sub-range `[k/n, (k+1)/n] × 100`, so the
//! displayed value is monotonic across phase boundaries even though the
//! underlying signals are not comparable in scale.

use serde::{Deserialize, Serialize};

/// Ordered phase labels for one workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePlan {
    labels: Vec<String>,
}

impl PhasePlan {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        debug_assert!(!labels.is_empty(), "phase plan needs at least one phase");
        Self { labels }
    }

    /// Number of phases.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a phase; out-of-range indexes clamp to the last phase.
    pub fn label(&self, phase: usize) -> &str {
        let idx = phase.min(self.labels.len().saturating_sub(1));
        self.labels.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Folds raw per-phase progress signals into one non-decreasing 0–100 value.
///
/// Raw values may arrive out of order or regress (parallel artifact downloads
/// report independently); they are clamped, not rejected.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    plan: PhasePlan,
    displayed: f64,
}

impl ProgressAggregator {
    pub fn new(plan: PhasePlan) -> Self {
        Self {
            plan,
            displayed: 0.0,
        }
    }

    /// Fold a raw progress report for `phase` into the displayed value.
    ///
    /// Returns the (possibly clamped) displayed percentage.
    pub fn observe(&mut self, phase: usize, raw_percent: f64) -> f64 {
        let n = self.plan.len().max(1) as f64;
        let k = phase.min(self.plan.len().saturating_sub(1)) as f64;
        let raw = raw_percent.clamp(0.0, 100.0);
        let mapped = (k + raw / 100.0) / n * 100.0;

        if mapped < self.displayed {
            tracing::debug!(
                phase,
                raw_percent,
                displayed = self.displayed,
                "regressive progress value clamped"
            );
        } else {
            self.displayed = mapped;
        }
        self.displayed
    }

    /// Force the displayed value to 100 (terminal success).
    pub fn complete(&mut self) -> f64 {
        self.displayed = 100.0;
        self.displayed
    }

    /// Current displayed percentage.
    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    /// Stage label for a phase index.
    pub fn stage_label(&self, phase: usize) -> &str {
        self.plan.label(phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plan() -> PhasePlan {
        PhasePlan::new(["fetch input", "load model", "transcribe"])
    }

    #[test]
    fn phases_map_onto_subranges() {
        let mut agg = ProgressAggregator::new(plan());
        assert_eq!(agg.observe(0, 0.0), 0.0);
        assert!((agg.observe(0, 50.0) - 100.0 / 6.0).abs() < 1e-9);
        assert!((agg.observe(1, 0.0) - 100.0 / 3.0).abs() < 1e-9);
        assert!((agg.observe(2, 100.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn regressive_raw_values_are_clamped() {
        let mut agg = ProgressAggregator::new(plan());
        let high = agg.observe(1, 80.0);
        // Stale report from an earlier phase must not move the bar backwards
        assert_eq!(agg.observe(0, 10.0), high);
        assert_eq!(agg.displayed(), high);
    }

    #[test]
    fn out_of_order_within_phase_is_clamped() {
        let mut agg = ProgressAggregator::new(plan());
        let v = agg.observe(0, 60.0);
        assert_eq!(agg.observe(0, 40.0), v);
    }

    #[test]
    fn out_of_range_phase_clamps_to_last() {
        let mut agg = ProgressAggregator::new(plan());
        let v = agg.observe(99, 50.0);
        assert!((v - (2.0 + 0.5) / 3.0 * 100.0).abs() < 1e-9);
        assert_eq!(agg.stage_label(99), "transcribe");
    }

    #[test]
    fn raw_values_outside_percent_range_clamp() {
        let mut agg = ProgressAggregator::new(plan());
        assert_eq!(agg.observe(0, -20.0), 0.0);
        let v = agg.observe(2, 400.0);
        assert!((v - 100.0).abs() < 1e-9);
    }

    #[test]
    fn complete_pins_to_hundred() {
        let mut agg = ProgressAggregator::new(plan());
        agg.observe(0, 10.0);
        assert_eq!(agg.complete(), 100.0);
        assert_eq!(agg.displayed(), 100.0);
    }

    #[test]
    fn single_phase_plan_is_identity() {
        let mut agg = ProgressAggregator::new(PhasePlan::new(["compress"]));
        assert!((agg.observe(0, 42.0) - 42.0).abs() < 1e-9);
    }

    proptest! {
        /// Displayed values are non-decreasing for any raw event sequence.
        #[test]
        fn displayed_never_decreases(events in prop::collection::vec((0usize..6, -50.0f64..200.0), 0..64)) {
            let mut agg = ProgressAggregator::new(plan());
            let mut last = 0.0f64;
            for (phase, raw) in events {
                let shown = agg.observe(phase, raw);
                prop_assert!(shown >= last);
                prop_assert!((0.0..=100.0).contains(&shown));
                last = shown;
            }
        }
    }
}
