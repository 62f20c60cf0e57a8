use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::{error, warn};

use crate::error::SchedulerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPriority {
    pub bookmark_id: i64,
    pub priority: f64,
    pub updated_at: DateTime<Utc>,
}

pub async fn get_priority(
    pool: &SqlitePool,
    bookmark_id: i64,
) -> Result<Option<BookmarkPriority>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "bookmark_priorities" WHERE "bookmarkId" = ?"#)
        .bind(bookmark_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| map_priority(&r)))
}

pub async fn priorities_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<BookmarkPriority>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT p.* FROM "bookmark_priorities" p
        JOIN "bookmarks" b ON b."id" = p."bookmarkId"
        WHERE b."userId" = ?
        ORDER BY p."priority" DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_priority).collect())
}

/// Upsert with optimistic concurrency: the stored `updatedAt` acts as the
/// version. A concurrent writer between our read and our guarded write makes
/// the write a no-op, which counts as one lost attempt; the value is
/// re-applied on the next pass. Exhausting the attempts is surfaced, never
/// swallowed.
pub async fn upsert_priority(
    pool: &SqlitePool,
    bookmark_id: i64,
    priority: f64,
    max_attempts: u32,
) -> Result<(), SchedulerError> {
    for attempt in 1..=max_attempts {
        let existing: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"SELECT "updatedAt" FROM "bookmark_priorities" WHERE "bookmarkId" = ?"#,
        )
        .bind(bookmark_id)
        .fetch_optional(pool)
        .await?;

        let now = Utc::now();
        let applied = match existing {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO "bookmark_priorities" ("bookmarkId", "priority", "updatedAt")
                    VALUES (?, ?, ?)
                    ON CONFLICT ("bookmarkId") DO NOTHING
                    "#,
                )
                .bind(bookmark_id)
                .bind(priority)
                .bind(now)
                .execute(pool)
                .await?;
                result.rows_affected() == 1
            }
            Some(seen_at) => {
                let result = sqlx::query(
                    r#"
                    UPDATE "bookmark_priorities"
                    SET "priority" = ?, "updatedAt" = ?
                    WHERE "bookmarkId" = ? AND "updatedAt" = ?
                    "#,
                )
                .bind(priority)
                .bind(now)
                .bind(bookmark_id)
                .bind(seen_at)
                .execute(pool)
                .await?;
                result.rows_affected() == 1
            }
        };

        if applied {
            return Ok(());
        }

        warn!(
            bookmark_id,
            attempt, "concurrent priority write detected, retrying"
        );
    }

    error!(
        bookmark_id,
        attempts = max_attempts,
        "priority upsert failed after exhausting retries"
    );
    Err(SchedulerError::PriorityConflict {
        bookmark_id,
        attempts: max_attempts,
    })
}

fn map_priority(row: &sqlx::sqlite::SqliteRow) -> BookmarkPriority {
    BookmarkPriority {
        bookmark_id: row.try_get("bookmarkId").unwrap_or_default(),
        priority: row.try_get("priority").unwrap_or_default(),
        updated_at: row.try_get("updatedAt").unwrap_or_else(|_| Utc::now()),
    }
}
