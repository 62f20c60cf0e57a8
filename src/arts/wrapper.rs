use std::collections::HashMap;

use crate::db::operations::exercises::{Exercise, LatencyStats};
use crate::error::SchedulerError;

use super::{PriorityAlgorithm, MIN_PRIORITY};

/// Adapts a raw exercise record into the inputs its priority formula needs:
/// trials elapsed, error flag, and the timing signal the wrapped family
/// expects (raw latency or a per-source z-score).
#[derive(Debug, Clone, Copy)]
pub struct AlgorithmWrapper {
    algorithm: PriorityAlgorithm,
}

impl AlgorithmWrapper {
    pub fn new(algorithm: PriorityAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> &PriorityAlgorithm {
        &self.algorithm
    }

    /// `max_trials` is the highest exercise id seen across the user's
    /// bookmarks; the exercise's own id against it counts the trials since
    /// this item was last presented. The caller guarantees the exercise has
    /// a positive solving latency.
    pub fn calculate(
        &self,
        exercise: Option<&Exercise>,
        max_trials: i64,
        stats: &HashMap<String, LatencyStats>,
    ) -> Result<f64, SchedulerError> {
        let exercise = exercise.ok_or(SchedulerError::MissingExercise)?;

        let trials_since_presented = (max_trials - exercise.id) as f64;
        let was_incorrect = !exercise.outcome.correct();
        let timing_signal = match &self.algorithm {
            PriorityAlgorithm::StandardizedDeviation(_) => {
                z_score(stats, &exercise.source, exercise.solving_speed as f64)
            }
            _ => exercise.solving_speed as f64,
        };

        Ok(self
            .algorithm
            .calculate(trials_since_presented, was_incorrect, timing_signal)
            .max(MIN_PRIORITY))
    }
}

fn z_score(stats: &HashMap<String, LatencyStats>, source: &str, latency_ms: f64) -> f64 {
    match stats.get(source) {
        Some(s) if s.std_dev > 0.0 => (latency_ms - s.mean) / s.std_dev,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::db::operations::exercises::ExerciseOutcome;

    use super::*;

    fn exercise(id: i64, outcome: ExerciseOutcome, solving_speed: i64) -> Exercise {
        Exercise {
            id,
            bookmark_id: 1,
            user_id: "u1".to_string(),
            outcome,
            solving_speed,
            source: "recognize".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn missing_exercise_is_an_invalid_argument() {
        let wrapper = AlgorithmWrapper::new(PriorityAlgorithm::ResponseTime(Default::default()));
        let result = wrapper.calculate(None, 10, &HashMap::new());
        assert!(matches!(result, Err(SchedulerError::MissingExercise)));
    }

    #[test]
    fn trials_count_down_from_max() {
        let wrapper = AlgorithmWrapper::new(PriorityAlgorithm::ResponseTime(Default::default()));
        let older = exercise(3, ExerciseOutcome::Correct, 5000);
        let newer = exercise(9, ExerciseOutcome::Correct, 5000);
        let p_older = wrapper.calculate(Some(&older), 10, &HashMap::new()).unwrap();
        let p_newer = wrapper.calculate(Some(&newer), 10, &HashMap::new()).unwrap();
        assert!(p_older > p_newer);
    }

    #[test]
    fn standardized_family_uses_source_z_score() {
        let wrapper =
            AlgorithmWrapper::new(PriorityAlgorithm::StandardizedDeviation(Default::default()));
        let mut stats = HashMap::new();
        stats.insert(
            "recognize".to_string(),
            LatencyStats {
                mean: 4000.0,
                std_dev: 1000.0,
                samples: 50,
            },
        );
        let slow = exercise(5, ExerciseOutcome::Correct, 6000);
        let fast = exercise(5, ExerciseOutcome::Correct, 2000);
        let p_slow = wrapper.calculate(Some(&slow), 10, &stats).unwrap();
        let p_fast = wrapper.calculate(Some(&fast), 10, &stats).unwrap();
        assert!(p_slow > p_fast);
        // Unknown source degrades to a neutral z-score, not an error.
        let other = Exercise {
            source: "translate".to_string(),
            ..slow
        };
        let p_other = wrapper.calculate(Some(&other), 10, &stats).unwrap();
        assert!(p_other.abs() < 1e-9);
    }

    #[test]
    fn computed_priorities_never_reach_the_exclusion_sentinel() {
        let wrapper = AlgorithmWrapper::new(PriorityAlgorithm::ResponseTime(Default::default()));
        // A 1ms answer after tens of thousands of trials pushes the raw
        // formula far below -1000 without the floor.
        let stale = exercise(1, ExerciseOutcome::Correct, 1);
        let p = wrapper
            .calculate(Some(&stale), 40_000, &HashMap::new())
            .unwrap();
        assert_eq!(p, crate::arts::MIN_PRIORITY);
        assert!(p > crate::arts::EXCLUDED_PRIORITY);
    }
}
