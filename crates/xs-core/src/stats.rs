//! Streaming weighted statistics.
//!
//! [`RunningStats`] folds event weights into `Σw` and `Σw²` (the same sums a
//! histogram keeps per bin as content and `sumw2`) and turns them into a
//! cross section with its statistical error once the stream is exhausted.
//!
//! The default estimator is the raw-sum formula
//! `sqrt(Σw² - (Σw)²/n) / (n - 1)`, kept exactly for output compatibility.
//! It suffers from catastrophic cancellation when the spread of the weights is
//! small compared to their magnitude; [`Estimator::Welford`] tracks the sum of
//! squared deviations incrementally and avoids that.
//!
//! With constant weights the raw-sum radicand can round to a tiny negative
//! number, so the default estimator reports `NaN` (e.g. three weights of
//! `0.1`). The Welford estimator reports `0` for the same input.

use crate::{Error, Estimator, EventRecord, Result, Summary};

/// Running sums of event weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    sum_weight: f64,
    sum_weight_squared: f64,
    // Welford state, only consulted by `Estimator::Welford`.
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one event.
    #[inline]
    pub fn update(&mut self, record: &EventRecord) {
        self.push(record.weight);
    }

    /// Accumulate one weight.
    ///
    /// No bounds checks: NaN and infinities propagate into the sums.
    #[inline]
    pub fn push(&mut self, weight: f64) {
        self.count += 1;
        self.sum_weight += weight;
        self.sum_weight_squared += weight * weight;

        let delta = weight - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (weight - self.mean);
    }

    /// Number of accumulated weights.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// `Σw`
    pub fn sum_weight(&self) -> f64 {
        self.sum_weight
    }

    /// `Σw²`
    pub fn sum_weight_squared(&self) -> f64 {
        self.sum_weight_squared
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fold another accumulator into this one.
    ///
    /// Raw sums add; the Welford state is combined with the pairwise update of
    /// Chan et al.
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;

        self.mean += delta * n_b / n;
        self.m2 += other.m2 + delta * delta * n_a * n_b / n;
        self.count += other.count;
        self.sum_weight += other.sum_weight;
        self.sum_weight_squared += other.sum_weight_squared;
    }

    /// Compute the cross section and its error.
    ///
    /// Fails with [`Error::EmptyStream`] for zero events and with
    /// [`Error::InsufficientSamples`] for a single event, where the `n - 1`
    /// normalization is undefined.
    pub fn finalize(&self, estimator: Estimator) -> Result<Summary> {
        let count = self.count;
        match count {
            0 => return Err(Error::EmptyStream),
            1 => return Err(Error::InsufficientSamples { count }),
            _ => {}
        }

        let n = count as f64;
        let mean = self.sum_weight / n;
        let error_estimate = match estimator {
            Estimator::Naive => {
                (self.sum_weight_squared - self.sum_weight * self.sum_weight / n).sqrt() / (n - 1.0)
            }
            Estimator::Welford => self.m2.sqrt() / (n - 1.0),
        };

        if !mean.is_finite() || !error_estimate.is_finite() {
            tracing::warn!(
                "non-finite result after {count} events (mean={mean}, error={error_estimate})"
            );
        }

        Ok(Summary { count, mean, error_estimate, interrupted: false })
    }
}

impl Extend<f64> for RunningStats {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for w in iter {
            self.push(w);
        }
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        let mut stats = RunningStats::new();
        stats.extend(iter);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::SQRT_2;

    fn naive(weights: &[f64]) -> Result<Summary> {
        weights.iter().copied().collect::<RunningStats>().finalize(Estimator::Naive)
    }

    #[test]
    fn empty_stream_is_rejected() {
        let stats = RunningStats::new();
        assert!(stats.is_empty());
        assert!(matches!(stats.finalize(Estimator::Naive), Err(Error::EmptyStream)));
        assert!(matches!(stats.finalize(Estimator::Welford), Err(Error::EmptyStream)));
    }

    #[test]
    fn single_event_is_rejected() {
        let err = naive(&[3.5]).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { count: 1 }));
    }

    #[test]
    fn unit_weights() {
        let s = naive(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 1.0);
        assert_eq!(s.error_estimate, 0.0);
        assert!(!s.interrupted);
    }

    #[test]
    fn two_events() {
        let stats: RunningStats = [2.0, 4.0].into_iter().collect();
        assert_eq!(stats.sum_weight(), 6.0);
        assert_eq!(stats.sum_weight_squared(), 20.0);

        let s = stats.finalize(Estimator::Naive).unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.error_estimate, SQRT_2);
    }

    #[test]
    fn reference_formula_fixtures() {
        // Σw = 10, Σw² = 30, 30 - 100/4 = 5
        let s = naive(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.error_estimate, 5.0_f64.sqrt() / 3.0);

        // Σw = 4.5, Σw² = 8.75, 8.75 - 20.25/3 = 2
        let s = naive(&[0.5, 1.5, 2.5]).unwrap();
        assert_eq!(s.mean, 1.5);
        assert_eq!(s.error_estimate, SQRT_2 / 2.0);

        // Negative weights (NLO subtraction events) enter the sums unchanged.
        // Σw = 0, Σw² = 8
        let s = naive(&[2.0, -2.0]).unwrap();
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.error_estimate, 8.0_f64.sqrt());
    }

    #[test]
    fn naive_formula_divides_the_squared_sum() {
        // (Σw)² / n and Σw * (Σw / n) round differently for Σw = 7, n = 3.
        let s = naive(&[1.0, 2.0, 4.0]).unwrap();
        assert_eq!(s.error_estimate, 1.0801234497346435);
        assert_ne!(s.error_estimate, (21.0_f64 - 7.0 * (7.0 / 3.0)).sqrt() / 2.0);
    }

    #[test]
    fn constant_weights_cancel_below_zero() {
        let stats: RunningStats = [0.1, 0.1, 0.1].into_iter().collect();

        let raw = stats.finalize(Estimator::Naive).unwrap();
        assert_eq!(raw.mean, 0.10000000000000002);
        assert!(raw.error_estimate.is_nan());
        assert_eq!(raw.to_string(), "XS 3 0.10000000000000002 NaN");

        let stable = stats.finalize(Estimator::Welford).unwrap();
        assert_eq!(stable.mean, raw.mean);
        assert_eq!(stable.error_estimate, 0.0);
    }

    #[test]
    fn count_increments_once_per_update() {
        let mut stats = RunningStats::new();
        let ev = EventRecord::new(21, 21, vec![25], 0.25);
        for i in 1..=5 {
            stats.update(&ev);
            assert_eq!(stats.count(), i);
        }
        assert_eq!(stats.sum_weight(), 1.25);
        assert!(stats.sum_weight_squared() >= 0.0);
    }

    #[test]
    fn nan_weight_propagates() {
        let s = naive(&[1.0, f64::NAN, 2.0]).unwrap();
        assert_eq!(s.count, 3);
        assert!(s.mean.is_nan());
        assert!(s.error_estimate.is_nan());
    }

    #[test]
    fn welford_matches_naive_on_well_conditioned_input() {
        let weights = [0.3, 1.7, 2.2, 0.9, 4.1, 3.3];
        let stats: RunningStats = weights.iter().copied().collect();
        let a = stats.finalize(Estimator::Naive).unwrap();
        let b = stats.finalize(Estimator::Welford).unwrap();
        assert_eq!(a.mean, b.mean);
        assert_relative_eq!(a.error_estimate, b.error_estimate, max_relative = 1e-12);
    }

    #[test]
    fn welford_avoids_cancellation() {
        let stats: RunningStats = [1e9 + 1.0, 1e9 + 3.0].into_iter().collect();
        let stable = stats.finalize(Estimator::Welford).unwrap();
        assert_eq!(stable.error_estimate, SQRT_2);

        // Σw² near 2e18 has an ulp of 256, so the spread cancels out entirely.
        let raw = stats.finalize(Estimator::Naive).unwrap();
        assert_eq!(raw.error_estimate, 0.0);
    }

    #[test]
    fn merge_equals_sequential_fold() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0];

        let mut left: RunningStats = a.into_iter().collect();
        let right: RunningStats = b.into_iter().collect();
        left.merge(&right);

        let all: RunningStats = a.into_iter().chain(b).collect();
        assert_eq!(left.count(), all.count());
        assert_eq!(left.sum_weight(), all.sum_weight());
        assert_eq!(left.sum_weight_squared(), all.sum_weight_squared());

        let merged = left.finalize(Estimator::Welford).unwrap();
        let folded = all.finalize(Estimator::Welford).unwrap();
        assert_relative_eq!(merged.mean, folded.mean, max_relative = 1e-15);
        assert_relative_eq!(merged.error_estimate, folded.error_estimate, max_relative = 1e-12);
    }

    #[test]
    fn merge_with_empty() {
        let mut stats = RunningStats::new();
        let other: RunningStats = [2.0, 4.0].into_iter().collect();
        stats.merge(&other);
        assert_eq!(stats, other);

        stats.merge(&RunningStats::new());
        assert_eq!(stats, other);
    }
}
