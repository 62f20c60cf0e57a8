mod common;

use chrono::{Duration, TimeZone, Utc};

use word_scheduler::db::operations::sessions::{self, SessionKind};
use word_scheduler::sessions::SessionEvent;
use word_scheduler::workers::session_sweep;
use word_scheduler::{
    close_all_sessions, update_exercise_session, update_reading_session,
};

use common::{seed_bookmark, seed_exercise, seed_user, setup};
use word_scheduler::db::operations::exercises::ExerciseOutcome;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap()
}

#[tokio::test]
async fn reading_session_lifecycle_with_grace_close() {
    let ctx = setup().await;

    let opened = update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap()
        .expect("opening should create a session");
    assert_eq!(opened.article_id.as_deref(), Some("a1"));
    assert_eq!(opened.start_time, t0());
    assert_eq!(opened.last_action_time, t0());
    assert_eq!(opened.duration_ms, 0);
    assert!(opened.is_active);

    let extended = update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Interaction,
        "u1",
        "a1",
        t0() + Duration::seconds(90),
    )
    .await
    .unwrap()
    .expect("interaction should extend the session");
    assert_eq!(extended.id, opened.id);
    assert_eq!(extended.duration_ms, 90_000);
    assert!(extended.is_active);

    // The close arrives 210s after the last action, past the 120s timeout:
    // the stale session gets one timeout of grace, then closes.
    let closed = update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Closing,
        "u1",
        "a1",
        t0() + Duration::seconds(300),
    )
    .await
    .unwrap()
    .expect("closing a stale session still returns it");
    assert_eq!(closed.id, opened.id);
    assert_eq!(closed.last_action_time, t0() + Duration::seconds(210));
    assert_eq!(closed.duration_ms, 210_000);
    assert!(!closed.is_active);
}

#[tokio::test]
async fn timed_out_reading_splits_into_two_sessions() {
    let ctx = setup().await;

    let first = update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap()
        .unwrap();

    let second = update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Opening,
        "u1",
        "a1",
        t0() + Duration::minutes(3),
    )
    .await
    .unwrap()
    .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.start_time, t0() + Duration::minutes(3));
    assert!(second.is_active);

    let all = sessions::sessions_for_user(ctx.db.pool(), "u1", SessionKind::Reading)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let old = all.iter().find(|s| s.id == first.id).unwrap();
    assert!(!old.is_active);
    // start == last action, so the grace extension is the whole duration.
    assert_eq!(old.duration_ms, 120_000);
}

#[tokio::test]
async fn redelivered_open_events_are_absorbed() {
    let ctx = setup().await;

    let first = update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap()
        .unwrap();
    let replay = update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, replay.id);
    assert_eq!(replay.duration_ms, 0);

    let all = sessions::sessions_for_user(ctx.db.pool(), "u1", SessionKind::Reading)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn closing_without_a_session_is_a_safe_no_op() {
    let ctx = setup().await;

    let result = update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Closing,
        "u1",
        "a1",
        t0(),
    )
    .await
    .unwrap();
    assert!(result.is_none());

    // It still cleans up strays: an active session on another article closes.
    update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a2", t0())
        .await
        .unwrap();
    update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Interaction,
        "u1",
        "a2",
        t0() + Duration::seconds(30),
    )
    .await
    .unwrap();

    let result = update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Closing,
        "u1",
        "a9",
        t0() + Duration::seconds(40),
    )
    .await
    .unwrap();
    assert!(result.is_none());

    let all = sessions::sessions_for_user(ctx.db.pool(), "u1", SessionKind::Reading)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(!all[0].is_active);
    assert_eq!(all[0].duration_ms, 30_000);
}

#[tokio::test]
async fn degenerate_sessions_are_deleted_not_closed() {
    let ctx = setup().await;

    update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap();
    let closed = update_reading_session(&ctx.db, &ctx.config, SessionEvent::Closing, "u1", "a1", t0())
        .await
        .unwrap();
    assert!(closed.is_none());

    let all = sessions::sessions_for_user(ctx.db.pool(), "u1", SessionKind::Reading)
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn opening_a_new_article_closes_the_previous_session() {
    let ctx = setup().await;

    let first = update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap()
        .unwrap();
    update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Interaction,
        "u1",
        "a1",
        t0() + Duration::seconds(45),
    )
    .await
    .unwrap();

    let second = update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Opening,
        "u1",
        "a2",
        t0() + Duration::seconds(60),
    )
    .await
    .unwrap()
    .unwrap();
    assert_ne!(first.id, second.id);

    let old = sessions::get_session(ctx.db.pool(), &first.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!old.is_active);
    assert_eq!(old.duration_ms, 45_000);
}

#[tokio::test]
async fn exercise_sessions_are_backdated_by_solving_latency() {
    let ctx = setup().await;
    seed_user(&ctx, "u1", "de").await;
    let bookmark = seed_bookmark(&ctx, "u1", "de").await;

    let scored_at = t0();
    let exercise = seed_exercise(&ctx, &bookmark, ExerciseOutcome::Correct, 5000, scored_at).await;

    let session = update_exercise_session(&ctx.db, &ctx.config, &exercise)
        .await
        .unwrap()
        .expect("exercise should open a session");
    assert_eq!(session.kind, SessionKind::Exercise);
    assert_eq!(session.start_time, scored_at - Duration::seconds(5));
    assert_eq!(session.duration_ms, 5000);

    // A second exercise inside the 21s window extends the same session.
    let next = seed_exercise(
        &ctx,
        &bookmark,
        ExerciseOutcome::Incorrect,
        3000,
        scored_at + Duration::seconds(10),
    )
    .await;
    let extended = update_exercise_session(&ctx.db, &ctx.config, &next)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(extended.id, session.id);
    assert_eq!(extended.duration_ms, 15_000);
}

#[tokio::test]
async fn exercise_backdating_is_clipped_to_the_timeout_window() {
    let ctx = setup().await;
    seed_user(&ctx, "u1", "de").await;
    let bookmark = seed_bookmark(&ctx, "u1", "de").await;

    // Latency longer than the 21s exercise timeout.
    let exercise = seed_exercise(&ctx, &bookmark, ExerciseOutcome::Correct, 60_000, t0()).await;
    let session = update_exercise_session(&ctx.db, &ctx.config, &exercise)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.start_time, t0() - Duration::seconds(21));
}

#[tokio::test]
async fn close_all_sessions_closes_whatever_is_active() {
    let ctx = setup().await;

    update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap();
    update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Interaction,
        "u1",
        "a1",
        t0() + Duration::seconds(30),
    )
    .await
    .unwrap();

    let closed = close_all_sessions(&ctx.db, &ctx.config, "u1", t0() + Duration::seconds(50))
        .await
        .unwrap();
    assert_eq!(closed.len(), 1);
    assert!(!closed[0].is_active);
    assert_eq!(closed[0].duration_ms, 30_000);

    let again = close_all_sessions(&ctx.db, &ctx.config, "u1", t0() + Duration::seconds(60))
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn duplicate_active_sessions_are_healed_to_one() {
    let ctx = setup().await;

    // Simulate the concurrent-writer anomaly by inserting two active
    // sessions for the same scope directly.
    let older = sessions::insert_session(
        ctx.db.pool(),
        "u1",
        SessionKind::Reading,
        Some("a1"),
        t0(),
        t0() + Duration::seconds(10),
    )
    .await
    .unwrap();
    let newer = sessions::insert_session(
        ctx.db.pool(),
        "u1",
        SessionKind::Reading,
        Some("a1"),
        t0() + Duration::seconds(20),
        t0() + Duration::seconds(40),
    )
    .await
    .unwrap();

    let touched = update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Interaction,
        "u1",
        "a1",
        t0() + Duration::seconds(60),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(touched.id, newer.id);

    let healed = sessions::get_session(ctx.db.pool(), &older.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!healed.is_active);

    let actives = sessions::active_sessions_for_user(ctx.db.pool(), "u1")
        .await
        .unwrap();
    assert_eq!(actives.len(), 1);
    assert_eq!(actives[0].id, newer.id);
}

#[tokio::test]
async fn sweep_grace_closes_stale_sessions() {
    let ctx = setup().await;

    update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap();
    update_reading_session(
        &ctx.db,
        &ctx.config,
        SessionEvent::Interaction,
        "u1",
        "a1",
        t0() + Duration::seconds(20),
    )
    .await
    .unwrap();

    let stats = session_sweep::sweep_stale_sessions(
        &ctx.db,
        &ctx.config,
        t0() + Duration::minutes(10),
    )
    .await
    .unwrap();
    assert_eq!(stats.closed, 1);
    assert_eq!(stats.deleted, 0);

    let all = sessions::sessions_for_user(ctx.db.pool(), "u1", SessionKind::Reading)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(!all[0].is_active);
    assert_eq!(all[0].duration_ms, 140_000);
}

#[tokio::test]
async fn session_records_serialize_camel_case() {
    let ctx = setup().await;

    let session = update_reading_session(&ctx.db, &ctx.config, SessionEvent::Opening, "u1", "a1", t0())
        .await
        .unwrap()
        .unwrap();
    let json = serde_json::to_value(&session).unwrap();
    assert!(json.get("lastActionTime").is_some());
    assert!(json.get("articleId").is_some());
    assert_eq!(json.get("isActive").and_then(|v| v.as_bool()), Some(true));
}
