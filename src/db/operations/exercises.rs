use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Latency recorded when the learner gave feedback instead of solving, or
/// when no timing was captured. Such exercises are excluded from scheduling.
pub const NO_SOLVING_SPEED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExerciseOutcome {
    Correct,
    Incorrect,
    TooEasy,
    ShowedSolution,
    Retry,
}

impl ExerciseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "CORRECT",
            Self::Incorrect => "INCORRECT",
            Self::TooEasy => "TOO_EASY",
            Self::ShowedSolution => "SHOWED_SOLUTION",
            Self::Retry => "RETRY",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CORRECT" => Self::Correct,
            "TOO_EASY" => Self::TooEasy,
            "SHOWED_SOLUTION" => Self::ShowedSolution,
            "RETRY" => Self::Retry,
            _ => Self::Incorrect,
        }
    }

    pub fn correct(&self) -> bool {
        matches!(self, Self::Correct | Self::TooEasy)
    }
}

/// One completed practice attempt on a bookmark. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub bookmark_id: i64,
    pub user_id: String,
    pub outcome: ExerciseOutcome,
    pub solving_speed: i64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExercise {
    pub bookmark_id: i64,
    pub user_id: String,
    pub outcome: ExerciseOutcome,
    pub solving_speed: i64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub mean: f64,
    pub std_dev: f64,
    pub samples: i64,
}

pub async fn insert_exercise(
    pool: &SqlitePool,
    exercise: NewExercise,
) -> Result<Exercise, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "exercises" ("bookmarkId", "userId", "outcome", "solvingSpeed", "source", "timestamp")
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(exercise.bookmark_id)
    .bind(&exercise.user_id)
    .bind(exercise.outcome.as_str())
    .bind(exercise.solving_speed)
    .bind(&exercise.source)
    .bind(exercise.timestamp)
    .execute(pool)
    .await?;

    Ok(Exercise {
        id: result.last_insert_rowid(),
        bookmark_id: exercise.bookmark_id,
        user_id: exercise.user_id,
        outcome: exercise.outcome,
        solving_speed: exercise.solving_speed,
        source: exercise.source,
        timestamp: exercise.timestamp,
    })
}

/// The most recent exercise per bookmark for this user, keyed by bookmark id.
/// Rows come back in timestamp order so a later record overwrites an earlier
/// one; ids break timestamp ties.
pub async fn latest_exercises(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<HashMap<i64, Exercise>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "exercises"
        WHERE "userId" = ?
        ORDER BY "timestamp" ASC, "id" ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut latest = HashMap::new();
    for row in rows.iter() {
        let exercise = map_exercise(row);
        latest.insert(exercise.bookmark_id, exercise);
    }
    Ok(latest)
}

pub async fn exercises_for_bookmark(
    pool: &SqlitePool,
    bookmark_id: i64,
) -> Result<Vec<Exercise>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "exercises"
        WHERE "bookmarkId" = ?
        ORDER BY "timestamp" ASC, "id" ASC
        "#,
    )
    .bind(bookmark_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_exercise).collect())
}

/// Per-source latency population over a recent window. Latencies above the
/// outlier ceiling and sentinel values are left out; the standardized
/// deviation algorithm normalizes against these numbers.
pub async fn source_latency_stats(
    pool: &SqlitePool,
    window_days: i64,
    outlier_ceiling_ms: i64,
) -> Result<HashMap<String, LatencyStats>, sqlx::Error> {
    let cutoff = Utc::now() - Duration::days(window_days);

    let rows = sqlx::query(
        r#"
        SELECT "source", "solvingSpeed" FROM "exercises"
        WHERE "timestamp" >= ? AND "solvingSpeed" > 0 AND "solvingSpeed" <= ?
        "#,
    )
    .bind(cutoff)
    .bind(outlier_ceiling_ms)
    .fetch_all(pool)
    .await?;

    let mut by_source: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        let source: String = row.try_get("source").unwrap_or_default();
        let speed: i64 = row.try_get("solvingSpeed").unwrap_or(0);
        by_source.entry(source).or_default().push(speed as f64);
    }

    let stats = by_source
        .into_iter()
        .map(|(source, latencies)| {
            let samples = latencies.len() as i64;
            let mean = latencies.iter().sum::<f64>() / samples as f64;
            let variance =
                latencies.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / samples as f64;
            (
                source,
                LatencyStats {
                    mean,
                    std_dev: variance.sqrt(),
                    samples,
                },
            )
        })
        .collect();

    Ok(stats)
}

/// Users with any exercise activity since the cutoff; the periodic priority
/// refresh iterates over these.
pub async fn recently_active_users(
    pool: &SqlitePool,
    since: DateTime<Utc>,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT DISTINCT "userId" FROM "exercises" WHERE "timestamp" >= ? ORDER BY "userId""#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

fn map_exercise(row: &sqlx::sqlite::SqliteRow) -> Exercise {
    let outcome_raw: String = row.try_get("outcome").unwrap_or_default();
    Exercise {
        id: row.try_get("id").unwrap_or_default(),
        bookmark_id: row.try_get("bookmarkId").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        outcome: ExerciseOutcome::from_str(&outcome_raw),
        solving_speed: row.try_get("solvingSpeed").unwrap_or(NO_SOLVING_SPEED),
        source: row.try_get("source").unwrap_or_default(),
        timestamp: row.try_get("timestamp").unwrap_or_else(|_| Utc::now()),
    }
}
