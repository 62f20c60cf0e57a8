use chrono::Utc;
use sqlx::SqlitePool;

pub async fn upsert_user(
    pool: &SqlitePool,
    user_id: &str,
    learned_language_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "users" ("id", "learnedLanguageId", "createdAt")
        VALUES (?, ?, ?)
        ON CONFLICT ("id") DO UPDATE SET "learnedLanguageId" = EXCLUDED."learnedLanguageId"
        "#,
    )
    .bind(user_id)
    .bind(learned_language_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_learned_language(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT "learnedLanguageId" FROM "users" WHERE "id" = ?"#)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
