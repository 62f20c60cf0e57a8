use sqlx::SqlitePool;

/// Scheduler-owned tables. Column names stay camelCase to match the schema
/// the owning application replicates from.
const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS "users" (
        "id" TEXT PRIMARY KEY,
        "learnedLanguageId" TEXT NOT NULL,
        "createdAt" TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "bookmarks" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "userId" TEXT NOT NULL,
        "languageId" TEXT NOT NULL,
        "fitForStudy" INTEGER NOT NULL DEFAULT 1,
        "learned" INTEGER NOT NULL DEFAULT 0,
        "starred" INTEGER NOT NULL DEFAULT 0,
        "createdAt" TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS "idx_bookmarks_user_fit"
    ON "bookmarks" ("userId", "fitForStudy")
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "exercises" (
        "id" INTEGER PRIMARY KEY AUTOINCREMENT,
        "bookmarkId" INTEGER NOT NULL,
        "userId" TEXT NOT NULL,
        "outcome" TEXT NOT NULL,
        "solvingSpeed" INTEGER NOT NULL,
        "source" TEXT NOT NULL,
        "timestamp" TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS "idx_exercises_user_time"
    ON "exercises" ("userId", "timestamp")
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS "idx_exercises_bookmark"
    ON "exercises" ("bookmarkId", "id")
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "bookmark_priorities" (
        "bookmarkId" INTEGER PRIMARY KEY,
        "priority" REAL NOT NULL,
        "updatedAt" TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "activity_sessions" (
        "id" TEXT PRIMARY KEY,
        "userId" TEXT NOT NULL,
        "kind" TEXT NOT NULL,
        "articleId" TEXT,
        "startTime" TEXT NOT NULL,
        "lastActionTime" TEXT NOT NULL,
        "durationMs" INTEGER NOT NULL,
        "isActive" INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS "idx_sessions_user_active"
    ON "activity_sessions" ("userId", "kind", "isActive")
    "#,
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
