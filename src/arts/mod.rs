//! Adaptive response-time-based sequencing: interchangeable priority
//! formulas that turn a learner's latest exercise into an urgency score.
//! Higher scores surface sooner in the next study batch.

pub mod ab_testing;
pub mod wrapper;

use rand::Rng;

/// Sentinel for bookmarks that were never exercised: new items surface first.
pub const MAX_PRIORITY: f64 = 10.0;

/// Sentinel for bookmarks whose last exercise carried no usable timing (the
/// learner gave feedback instead of solving). Strictly below [`MIN_PRIORITY`],
/// so these never reach a study batch.
pub const EXCLUDED_PRIORITY: f64 = -1000.0;

/// Floor for computed priorities. Huge trial gaps combined with sub-threshold
/// latencies can drive the formulas arbitrarily low; clamping keeps every
/// real score above the exclusion sentinel.
pub const MIN_PRIORITY: f64 = -999.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseTimeParams {
    pub a: f64,
    pub d: f64,
    pub b: f64,
    pub r: f64,
    pub w: f64,
}

impl Default for ResponseTimeParams {
    fn default() -> Self {
        Self {
            a: 0.1,
            d: 2.0,
            b: 1.1,
            r: 1.7,
            w: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardizedParams {
    pub a: f64,
    pub d: f64,
    pub b: f64,
    pub r: f64,
    pub w: f64,
}

impl Default for StandardizedParams {
    fn default() -> Self {
        Self {
            a: 0.1,
            d: 2.0,
            b: 1.1,
            r: 1.7,
            w: 20.0,
        }
    }
}

/// One priority formula. Selected by configuration, never by runtime type
/// inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriorityAlgorithm {
    /// `a * (N - d) * ((1 - alpha) * b * ln(RT / r) + alpha * w)`.
    /// The log term discounts fast, well-known responses; the `alpha * w`
    /// term gives wrong answers a constant urgency boost decoupled from
    /// timing. The timing signal is the raw latency in milliseconds and must
    /// be positive; callers filter out sentinel latencies.
    ResponseTime(ResponseTimeParams),
    /// Same shape with `ln(e^(r * sd))` in place of `ln(RT / r)`, where `sd`
    /// is the latency z-score against the exercise source's population.
    StandardizedDeviation(StandardizedParams),
    /// Uniform noise. Experimental control only, never in the default roster.
    RandomControl,
}

impl PriorityAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResponseTime(_) => "response-time",
            Self::StandardizedDeviation(_) => "standardized-deviation",
            Self::RandomControl => "random-control",
        }
    }

    /// `trials_since_presented` is the number of trials elapsed since this
    /// item was last shown; `timing_signal` is a raw latency for the
    /// response-time family and a z-score for the standardized family.
    pub fn calculate(
        &self,
        trials_since_presented: f64,
        was_incorrect: bool,
        timing_signal: f64,
    ) -> f64 {
        let alpha = if was_incorrect { 1.0 } else { 0.0 };
        match self {
            Self::ResponseTime(p) => {
                p.a * (trials_since_presented - p.d)
                    * ((1.0 - alpha) * p.b * (timing_signal / p.r).ln() + alpha * p.w)
            }
            Self::StandardizedDeviation(p) => {
                // ln(e^(r * sd)) collapses to r * sd
                p.a * (trials_since_presented - p.d)
                    * ((1.0 - alpha) * p.b * (p.r * timing_signal) + alpha * p.w)
            }
            Self::RandomControl => rand::rng().random::<f64>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn response_time_discounts_fast_answers() {
        let algo = PriorityAlgorithm::ResponseTime(ResponseTimeParams::default());
        let fast = algo.calculate(10.0, false, 800.0);
        let slow = algo.calculate(10.0, false, 8000.0);
        assert!(slow > fast);
    }

    #[test]
    fn incorrect_answers_outrank_slow_correct_ones() {
        let algo = PriorityAlgorithm::ResponseTime(ResponseTimeParams::default());
        let wrong = algo.calculate(10.0, true, 800.0);
        let slow_correct = algo.calculate(10.0, false, 20_000.0);
        assert!(wrong > slow_correct);
    }

    #[test]
    fn incorrect_priority_ignores_timing() {
        let algo = PriorityAlgorithm::ResponseTime(ResponseTimeParams::default());
        let a = algo.calculate(7.0, true, 100.0);
        let b = algo.calculate(7.0, true, 90_000.0);
        assert!((a - b).abs() < f64::EPSILON);
    }

    #[test]
    fn standardized_matches_expected_value() {
        let p = StandardizedParams::default();
        let algo = PriorityAlgorithm::StandardizedDeviation(p);
        let got = algo.calculate(10.0, false, 1.5);
        let want = p.a * (10.0 - p.d) * (p.b * p.r * 1.5);
        assert!((got - want).abs() < 1e-9);
    }

    #[test]
    fn random_control_stays_in_unit_interval() {
        let algo = PriorityAlgorithm::RandomControl;
        for _ in 0..100 {
            let v = algo.calculate(5.0, false, 1000.0);
            assert!((0.0..1.0).contains(&v));
        }
    }

    proptest! {
        #[test]
        fn priority_monotone_in_trials_for_slow_answers(
            n in 3.0f64..10_000.0,
            rt in 2000.0f64..60_000.0,
        ) {
            // Past the d offset, more elapsed trials means more urgency
            // whenever the timing term is positive (RT > r).
            let algo = PriorityAlgorithm::ResponseTime(ResponseTimeParams::default());
            let near = algo.calculate(n, false, rt);
            let far = algo.calculate(n + 1.0, false, rt);
            prop_assert!(far > near);
        }

        #[test]
        fn incorrect_boost_dominates_for_any_latency(
            n in 3.0f64..10_000.0,
            rt in 1.0f64..30_000.0,
        ) {
            let algo = PriorityAlgorithm::ResponseTime(ResponseTimeParams::default());
            let wrong = algo.calculate(n, true, rt);
            let right = algo.calculate(n, false, rt);
            prop_assert!(wrong > right);
        }
    }
}
