use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionKind {
    Reading,
    Exercise,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reading => "READING",
            Self::Exercise => "EXERCISE",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "READING" => Self::Reading,
            _ => Self::Exercise,
        }
    }

    pub fn timeout(&self, config: &Config) -> Duration {
        match self {
            Self::Reading => config.reading_timeout(),
            Self::Exercise => config.exercise_timeout(),
        }
    }
}

/// One discrete stretch of reading or exercise activity. Active sessions are
/// extended in place; closed ones are historical records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySession {
    pub id: String,
    pub user_id: String,
    pub kind: SessionKind,
    pub article_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub last_action_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub is_active: bool,
}

/// Active sessions for one scope key, most recently touched first. Reading
/// sessions are scoped to an article; exercise sessions to the user alone.
pub async fn find_active(
    pool: &SqlitePool,
    user_id: &str,
    kind: SessionKind,
    article_id: Option<&str>,
) -> Result<Vec<ActivitySession>, sqlx::Error> {
    let rows = if let Some(article_id) = article_id {
        sqlx::query(
            r#"
            SELECT * FROM "activity_sessions"
            WHERE "userId" = ? AND "kind" = ? AND "articleId" = ? AND "isActive" = 1
            ORDER BY "lastActionTime" DESC
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(article_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query(
            r#"
            SELECT * FROM "activity_sessions"
            WHERE "userId" = ? AND "kind" = ? AND "isActive" = 1
            ORDER BY "lastActionTime" DESC
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_all(pool)
        .await?
    };
    Ok(rows.iter().map(map_session).collect())
}

/// Every active session the user holds, across both kinds.
pub async fn active_sessions_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<ActivitySession>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "activity_sessions"
        WHERE "userId" = ? AND "isActive" = 1
        ORDER BY "lastActionTime" DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_session).collect())
}

/// Active sessions of one kind whose last action is older than the cutoff.
pub async fn stale_active_sessions(
    pool: &SqlitePool,
    kind: SessionKind,
    cutoff: DateTime<Utc>,
) -> Result<Vec<ActivitySession>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "activity_sessions"
        WHERE "kind" = ? AND "isActive" = 1 AND "lastActionTime" < ?
        ORDER BY "lastActionTime" ASC
        "#,
    )
    .bind(kind.as_str())
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_session).collect())
}

pub async fn insert_session(
    pool: &SqlitePool,
    user_id: &str,
    kind: SessionKind,
    article_id: Option<&str>,
    start_time: DateTime<Utc>,
    last_action_time: DateTime<Utc>,
) -> Result<ActivitySession, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let duration_ms = (last_action_time - start_time).num_milliseconds();
    sqlx::query(
        r#"
        INSERT INTO "activity_sessions"
        ("id", "userId", "kind", "articleId", "startTime", "lastActionTime", "durationMs", "isActive")
        VALUES (?, ?, ?, ?, ?, ?, ?, 1)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(kind.as_str())
    .bind(article_id)
    .bind(start_time)
    .bind(last_action_time)
    .bind(duration_ms)
    .execute(pool)
    .await?;

    Ok(ActivitySession {
        id,
        user_id: user_id.to_string(),
        kind,
        article_id: article_id.map(str::to_string),
        start_time,
        last_action_time,
        duration_ms,
        is_active: true,
    })
}

pub async fn extend_session<'e, E>(
    executor: E,
    session_id: &str,
    last_action_time: DateTime<Utc>,
    duration_ms: i64,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE "activity_sessions"
        SET "lastActionTime" = ?, "durationMs" = ?
        WHERE "id" = ?
        "#,
    )
    .bind(last_action_time)
    .bind(duration_ms)
    .bind(session_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn mark_closed<'e, E>(
    executor: E,
    session_id: &str,
    last_action_time: DateTime<Utc>,
    duration_ms: i64,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE "activity_sessions"
        SET "lastActionTime" = ?, "durationMs" = ?, "isActive" = 0
        WHERE "id" = ?
        "#,
    )
    .bind(last_action_time)
    .bind(duration_ms)
    .bind(session_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_session<'e, E>(executor: E, session_id: &str) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(r#"DELETE FROM "activity_sessions" WHERE "id" = ?"#)
        .bind(session_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn get_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Option<ActivitySession>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "activity_sessions" WHERE "id" = ?"#)
        .bind(session_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| map_session(&r)))
}

pub async fn sessions_for_user(
    pool: &SqlitePool,
    user_id: &str,
    kind: SessionKind,
) -> Result<Vec<ActivitySession>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "activity_sessions"
        WHERE "userId" = ? AND "kind" = ?
        ORDER BY "startTime" ASC
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_session).collect())
}

fn map_session(row: &sqlx::sqlite::SqliteRow) -> ActivitySession {
    let kind_raw: String = row.try_get("kind").unwrap_or_default();
    ActivitySession {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        kind: SessionKind::from_str(&kind_raw),
        article_id: row
            .try_get::<Option<String>, _>("articleId")
            .ok()
            .flatten(),
        start_time: row.try_get("startTime").unwrap_or_else(|_| Utc::now()),
        last_action_time: row.try_get("lastActionTime").unwrap_or_else(|_| Utc::now()),
        duration_ms: row.try_get("durationMs").unwrap_or_default(),
        is_active: row.try_get("isActive").unwrap_or(false),
    }
}
