use chrono::Duration;

use crate::arts::ab_testing::AbTesting;
use crate::arts::wrapper::AlgorithmWrapper;
use crate::arts::{PriorityAlgorithm, ResponseTimeParams, StandardizedParams};

const DEFAULT_READING_TIMEOUT_SECS: i64 = 120;
const DEFAULT_EXERCISE_TIMEOUT_SECS: i64 = 21;
const DEFAULT_UPSERT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_STATS_WINDOW_DAYS: i64 = 30;
const DEFAULT_OUTLIER_CEILING_MS: i64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    ResponseTime,
    StandardizedDeviation,
    RandomControl,
}

impl AlgorithmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResponseTime => "response-time",
            Self::StandardizedDeviation => "standardized-deviation",
            Self::RandomControl => "random-control",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "response-time" => Some(Self::ResponseTime),
            "standardized-deviation" => Some(Self::StandardizedDeviation),
            "random-control" => Some(Self::RandomControl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub reading_session_timeout_secs: i64,
    pub exercise_session_timeout_secs: i64,
    pub priority_upsert_max_attempts: u32,
    pub latency_stats_window_days: i64,
    pub latency_outlier_ceiling_ms: i64,
    pub algorithms: Vec<AlgorithmKind>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reading_session_timeout_secs: DEFAULT_READING_TIMEOUT_SECS,
            exercise_session_timeout_secs: DEFAULT_EXERCISE_TIMEOUT_SECS,
            priority_upsert_max_attempts: DEFAULT_UPSERT_MAX_ATTEMPTS,
            latency_stats_window_days: DEFAULT_STATS_WINDOW_DAYS,
            latency_outlier_ceiling_ms: DEFAULT_OUTLIER_CEILING_MS,
            algorithms: vec![
                AlgorithmKind::ResponseTime,
                AlgorithmKind::StandardizedDeviation,
            ],
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let algorithms = std::env::var("SCHEDULER_ALGORITHMS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .filter_map(AlgorithmKind::from_str)
                    .collect::<Vec<_>>()
            })
            .filter(|parsed| !parsed.is_empty())
            .unwrap_or_else(|| defaults.algorithms.clone());

        Self {
            reading_session_timeout_secs: env_i64(
                "READING_SESSION_TIMEOUT_SECS",
                defaults.reading_session_timeout_secs,
            ),
            exercise_session_timeout_secs: env_i64(
                "EXERCISE_SESSION_TIMEOUT_SECS",
                defaults.exercise_session_timeout_secs,
            ),
            priority_upsert_max_attempts: env_i64(
                "PRIORITY_UPSERT_MAX_ATTEMPTS",
                defaults.priority_upsert_max_attempts as i64,
            )
            .max(1) as u32,
            latency_stats_window_days: env_i64(
                "LATENCY_STATS_WINDOW_DAYS",
                defaults.latency_stats_window_days,
            ),
            latency_outlier_ceiling_ms: env_i64(
                "LATENCY_OUTLIER_CEILING_MS",
                defaults.latency_outlier_ceiling_ms,
            ),
            algorithms,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn reading_timeout(&self) -> Duration {
        Duration::seconds(self.reading_session_timeout_secs)
    }

    pub fn exercise_timeout(&self) -> Duration {
        Duration::seconds(self.exercise_session_timeout_secs)
    }

    /// Builds the A/B roster from the configured algorithm list. The roster is
    /// an explicit value handed to the scheduler components, never shared
    /// mutable state.
    pub fn ab_testing(&self) -> AbTesting {
        let wrappers = self
            .algorithms
            .iter()
            .map(|kind| {
                let algorithm = match kind {
                    AlgorithmKind::ResponseTime => {
                        PriorityAlgorithm::ResponseTime(ResponseTimeParams::default())
                    }
                    AlgorithmKind::StandardizedDeviation => {
                        PriorityAlgorithm::StandardizedDeviation(StandardizedParams::default())
                    }
                    AlgorithmKind::RandomControl => PriorityAlgorithm::RandomControl,
                };
                AlgorithmWrapper::new(algorithm)
            })
            .collect();
        AbTesting::new(wrappers)
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roster_excludes_random_control() {
        let config = Config::default();
        assert_eq!(config.algorithms.len(), 2);
        assert!(!config.algorithms.contains(&AlgorithmKind::RandomControl));
    }

    #[test]
    fn algorithm_kind_round_trip() {
        for kind in [
            AlgorithmKind::ResponseTime,
            AlgorithmKind::StandardizedDeviation,
            AlgorithmKind::RandomControl,
        ] {
            assert_eq!(AlgorithmKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(AlgorithmKind::from_str("fsrs"), None);
    }
}
