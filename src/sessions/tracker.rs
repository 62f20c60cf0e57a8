use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::config::Config;
use crate::db::operations::sessions as session_ops;
use crate::db::operations::sessions::{ActivitySession, SessionKind};
use crate::db::SchedulerDb;
use crate::error::SchedulerError;

use super::{finalize, force_close, is_stale, SessionEvent};

/// The shared state machine behind reading and exercise session tracking.
///
/// It always queries for the current active session before creating one, so
/// re-delivered events are absorbed as updates instead of duplicate records.
pub(crate) struct SessionTracker<'a> {
    db: &'a SchedulerDb,
    config: &'a Config,
    kind: SessionKind,
}

impl<'a> SessionTracker<'a> {
    pub(crate) fn new(db: &'a SchedulerDb, config: &'a Config, kind: SessionKind) -> Self {
        Self { db, config, kind }
    }

    fn timeout(&self) -> Duration {
        self.kind.timeout(self.config)
    }

    /// Applies one event to the session scoped by (user, kind[, article]).
    /// `start_hint` backdates a brand-new session, clipped so its start
    /// never precedes the timeout window before the event.
    pub(crate) async fn track(
        &self,
        user_id: &str,
        article_id: Option<&str>,
        event: SessionEvent,
        at: DateTime<Utc>,
        start_hint: Option<DateTime<Utc>>,
    ) -> Result<Option<ActivitySession>, SchedulerError> {
        let current = self.find_current(user_id, article_id, at).await?;

        match (current, event) {
            (None, SessionEvent::Closing) => {
                // Nothing to close for this scope; stray actives are cleaned
                // up anyway and the caller gets no session back.
                self.close_other_actives(user_id, at).await?;
                Ok(None)
            }
            (None, _) => {
                self.close_other_actives(user_id, at).await?;
                self.open(user_id, article_id, at, start_hint).await.map(Some)
            }
            (Some(session), SessionEvent::Closing) => {
                if is_stale(&session, at, self.timeout()) {
                    let graced = session.last_action_time + self.timeout();
                    finalize(self.db.pool(), session, graced).await
                } else {
                    finalize(self.db.pool(), session, at).await
                }
            }
            (Some(session), _) => {
                if is_stale(&session, at, self.timeout()) {
                    let graced = session.last_action_time + self.timeout();
                    finalize(self.db.pool(), session, graced).await?;
                    self.open(user_id, article_id, at, start_hint).await.map(Some)
                } else {
                    self.extend(session, at).await.map(Some)
                }
            }
        }
    }

    /// The active session for this scope, after self-healing the anomaly of
    /// several simultaneously active ones: everything but the most recently
    /// touched session is closed inside one transaction, since duplicates
    /// are the known symptom of concurrent writers.
    async fn find_current(
        &self,
        user_id: &str,
        article_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Option<ActivitySession>, SchedulerError> {
        let mut actives =
            session_ops::find_active(self.db.pool(), user_id, self.kind, article_id).await?;

        if actives.len() > 1 {
            warn!(
                user_id,
                kind = self.kind.as_str(),
                count = actives.len(),
                "multiple active sessions for one scope, keeping the most recent"
            );
            let keep = actives.remove(0);
            let timeout = self.timeout();

            let mut tx = self.db.pool().begin().await?;
            for duplicate in actives {
                let final_last_action = if is_stale(&duplicate, at, timeout) {
                    duplicate.last_action_time + timeout
                } else {
                    duplicate.last_action_time
                };
                let duration_ms = (final_last_action - duplicate.start_time).num_milliseconds();
                if duration_ms <= 0 {
                    session_ops::delete_session(&mut *tx, &duplicate.id).await?;
                } else {
                    session_ops::mark_closed(&mut *tx, &duplicate.id, final_last_action, duration_ms)
                        .await?;
                }
            }
            tx.commit().await?;

            return Ok(Some(keep));
        }

        Ok(actives.pop())
    }

    /// A learner is single-threaded at the session level: starting a new
    /// session closes whatever else they still had open, either kind.
    async fn close_other_actives(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let actives = session_ops::active_sessions_for_user(self.db.pool(), user_id).await?;
        for session in actives {
            force_close(self.db.pool(), self.config, session, at).await?;
        }
        Ok(())
    }

    async fn open(
        &self,
        user_id: &str,
        article_id: Option<&str>,
        at: DateTime<Utc>,
        start_hint: Option<DateTime<Utc>>,
    ) -> Result<ActivitySession, SchedulerError> {
        let start = start_hint.unwrap_or(at).min(at).max(at - self.timeout());
        let session =
            session_ops::insert_session(self.db.pool(), user_id, self.kind, article_id, start, at)
                .await?;
        Ok(session)
    }

    async fn extend(
        &self,
        session: ActivitySession,
        at: DateTime<Utc>,
    ) -> Result<ActivitySession, SchedulerError> {
        let duration_ms = (at - session.start_time).num_milliseconds();
        session_ops::extend_session(self.db.pool(), &session.id, at, duration_ms).await?;
        Ok(ActivitySession {
            last_action_time: at,
            duration_ms,
            ..session
        })
    }
}
