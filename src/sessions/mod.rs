//! Converts streams of timestamped reading and exercise events into discrete
//! session records. One tracker implementation serves both activity kinds;
//! only the scope key (user + article vs. user) and the timeout differ.

mod tracker;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::config::Config;
use crate::db::operations::exercises::Exercise;
use crate::db::operations::sessions as session_ops;
use crate::db::SchedulerDb;
use crate::error::SchedulerError;

pub use crate::db::operations::sessions::{ActivitySession, SessionKind};
use tracker::SessionTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    Opening,
    Interaction,
    Closing,
}

/// Feeds one reading event into the session state machine. Returns the
/// touched session, or None when a closing event found nothing to close or
/// the closed session was degenerate.
pub async fn update_reading_session(
    db: &SchedulerDb,
    config: &Config,
    event: SessionEvent,
    user_id: &str,
    article_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<ActivitySession>, SchedulerError> {
    SessionTracker::new(db, config, SessionKind::Reading)
        .track(user_id, Some(article_id), event, now, None)
        .await
}

/// Feeds one scored exercise into the session state machine. A brand-new
/// session is backdated by the exercise's own solving latency, clipped to at
/// most one timeout before the event, so the session starts roughly when the
/// exercise began rather than when it was scored.
pub async fn update_exercise_session(
    db: &SchedulerDb,
    config: &Config,
    exercise: &Exercise,
) -> Result<Option<ActivitySession>, SchedulerError> {
    let at = exercise.timestamp;
    let start_hint = at - Duration::milliseconds(exercise.solving_speed.max(0));
    SessionTracker::new(db, config, SessionKind::Exercise)
        .track(
            &exercise.user_id,
            None,
            SessionEvent::Interaction,
            at,
            Some(start_hint),
        )
        .await
}

/// Administrative cleanup, e.g. on logout: closes every active session the
/// user holds, granting the grace extension to stale ones. Returns the
/// sessions that survived closing.
pub async fn close_all_sessions(
    db: &SchedulerDb,
    config: &Config,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<ActivitySession>, SchedulerError> {
    let pool = db.pool();
    let actives = session_ops::active_sessions_for_user(pool, user_id).await?;

    let mut closed = Vec::with_capacity(actives.len());
    for session in actives {
        if let Some(session) = force_close(pool, config, session, now).await? {
            closed.push(session);
        }
    }
    Ok(closed)
}

/// Closes a session the learner is no longer driving. A stale session gets
/// the grace extension (one timeout past its last action); a fresh one is
/// closed where it stands.
pub(crate) async fn force_close(
    pool: &SqlitePool,
    config: &Config,
    session: ActivitySession,
    at: DateTime<Utc>,
) -> Result<Option<ActivitySession>, SchedulerError> {
    let timeout = session.kind.timeout(config);
    let final_last_action = if is_stale(&session, at, timeout) {
        session.last_action_time + timeout
    } else {
        session.last_action_time
    };
    finalize(pool, session, final_last_action).await
}

/// Marks the session closed with its final duration, or deletes it when the
/// duration would be zero: a degenerate session is noise, not history.
pub(crate) async fn finalize(
    pool: &SqlitePool,
    session: ActivitySession,
    final_last_action: DateTime<Utc>,
) -> Result<Option<ActivitySession>, SchedulerError> {
    let duration_ms = (final_last_action - session.start_time).num_milliseconds();
    if duration_ms <= 0 {
        session_ops::delete_session(pool, &session.id).await?;
        debug!(session_id = %session.id, "degenerate session deleted");
        return Ok(None);
    }

    session_ops::mark_closed(pool, &session.id, final_last_action, duration_ms).await?;
    Ok(Some(ActivitySession {
        last_action_time: final_last_action,
        duration_ms,
        is_active: false,
        ..session
    }))
}

pub(crate) fn is_stale(session: &ActivitySession, at: DateTime<Utc>, timeout: Duration) -> bool {
    at - session.last_action_time > timeout
}
