use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::arts::{EXCLUDED_PRIORITY, MAX_PRIORITY};

/// A learner's association with one vocabulary occurrence. The scheduling
/// core mutates its flags and priorities but never deletes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: i64,
    pub user_id: String,
    pub language_id: String,
    pub fit_for_study: bool,
    pub learned: bool,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct BookmarkFlags {
    pub fit_for_study: bool,
    pub learned: bool,
    pub starred: bool,
}

pub async fn create_bookmark(
    pool: &SqlitePool,
    user_id: &str,
    language_id: &str,
    flags: BookmarkFlags,
) -> Result<Bookmark, sqlx::Error> {
    let created_at = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO "bookmarks" ("userId", "languageId", "fitForStudy", "learned", "starred", "createdAt")
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(language_id)
    .bind(flags.fit_for_study)
    .bind(flags.learned)
    .bind(flags.starred)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(Bookmark {
        id: result.last_insert_rowid(),
        user_id: user_id.to_string(),
        language_id: language_id.to_string(),
        fit_for_study: flags.fit_for_study,
        learned: flags.learned,
        starred: flags.starred,
        created_at,
    })
}

pub async fn set_learned(pool: &SqlitePool, bookmark_id: i64, learned: bool) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE "bookmarks" SET "learned" = ? WHERE "id" = ?"#)
        .bind(learned)
        .bind(bookmark_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_fit_for_study(
    pool: &SqlitePool,
    bookmark_id: i64,
    fit_for_study: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE "bookmarks" SET "fitForStudy" = ? WHERE "id" = ?"#)
        .bind(fit_for_study)
        .bind(bookmark_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_starred(pool: &SqlitePool, bookmark_id: i64, starred: bool) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE "bookmarks" SET "starred" = ? WHERE "id" = ?"#)
        .bind(starred)
        .bind(bookmark_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All bookmarks the priority updater has to score for this user.
pub async fn fit_for_study_bookmarks(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Bookmark>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "bookmarks"
        WHERE "userId" = ? AND "fitForStudy" = 1
        ORDER BY "id" ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_bookmark).collect())
}

/// Candidates for the next study batch: not learned, in the user's current
/// learning language, flagged fit-for-study or starred, excluding items the
/// learner asked never to resurface. Highest priority first; bookmarks that
/// were never scored sort as brand-new.
pub async fn eligible_for_study(
    pool: &SqlitePool,
    user_id: &str,
    language_id: &str,
) -> Result<Vec<Bookmark>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT b.*
        FROM "bookmarks" b
        LEFT JOIN "bookmark_priorities" p ON p."bookmarkId" = b."id"
        WHERE b."userId" = ?
          AND b."languageId" = ?
          AND b."learned" = 0
          AND (b."fitForStudy" = 1 OR b."starred" = 1)
          AND COALESCE(p."priority", ?) > ?
        ORDER BY COALESCE(p."priority", ?) DESC, b."id" ASC
        "#,
    )
    .bind(user_id)
    .bind(language_id)
    .bind(MAX_PRIORITY)
    .bind(EXCLUDED_PRIORITY)
    .bind(MAX_PRIORITY)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_bookmark).collect())
}

fn map_bookmark(row: &sqlx::sqlite::SqliteRow) -> Bookmark {
    Bookmark {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        language_id: row.try_get("languageId").unwrap_or_default(),
        fit_for_study: row.try_get("fitForStudy").unwrap_or(false),
        learned: row.try_get("learned").unwrap_or(false),
        starred: row.try_get("starred").unwrap_or(false),
        created_at: row.try_get("createdAt").unwrap_or_else(|_| Utc::now()),
    }
}
