#![allow(dead_code)]

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use word_scheduler::db::operations::bookmarks::{self, Bookmark, BookmarkFlags};
use word_scheduler::db::operations::exercises::{self, Exercise, ExerciseOutcome, NewExercise};
use word_scheduler::db::operations::users;
use word_scheduler::{Config, SchedulerDb};

pub struct TestDb {
    pub db: SchedulerDb,
    pub config: Config,
    _dir: TempDir,
}

pub async fn setup() -> TestDb {
    let _ = word_scheduler::logging::init_tracing("warn");

    let dir = TempDir::new().expect("failed to create temp dir");
    let db_path = dir.path().join("scheduler.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.display());
    let db = SchedulerDb::connect(&url)
        .await
        .expect("failed to open test database");

    TestDb {
        db,
        config: Config::default(),
        _dir: dir,
    }
}

pub async fn seed_user(ctx: &TestDb, user_id: &str, language_id: &str) {
    users::upsert_user(ctx.db.pool(), user_id, language_id)
        .await
        .expect("failed to seed user");
}

pub async fn seed_bookmark(ctx: &TestDb, user_id: &str, language_id: &str) -> Bookmark {
    seed_bookmark_with_flags(
        ctx,
        user_id,
        language_id,
        BookmarkFlags {
            fit_for_study: true,
            learned: false,
            starred: false,
        },
    )
    .await
}

pub async fn seed_bookmark_with_flags(
    ctx: &TestDb,
    user_id: &str,
    language_id: &str,
    flags: BookmarkFlags,
) -> Bookmark {
    bookmarks::create_bookmark(ctx.db.pool(), user_id, language_id, flags)
        .await
        .expect("failed to seed bookmark")
}

pub async fn seed_exercise(
    ctx: &TestDb,
    bookmark: &Bookmark,
    outcome: ExerciseOutcome,
    solving_speed: i64,
    timestamp: DateTime<Utc>,
) -> Exercise {
    exercises::insert_exercise(
        ctx.db.pool(),
        NewExercise {
            bookmark_id: bookmark.id,
            user_id: bookmark.user_id.clone(),
            outcome,
            solving_speed,
            source: "recognize".to_string(),
            timestamp,
        },
    )
    .await
    .expect("failed to seed exercise")
}
