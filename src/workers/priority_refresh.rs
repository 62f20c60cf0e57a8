use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::db::operations::exercises;
use crate::db::SchedulerDb;
use crate::scheduler::update_priorities;

use super::WorkerError;

const ACTIVITY_LOOKBACK_HOURS: i64 = 24;

#[derive(Debug, Default)]
pub struct RefreshStats {
    pub users_seen: usize,
    pub users_failed: usize,
    pub duration_secs: f64,
}

/// Recomputes priorities for every user with recent exercise activity. A
/// failure for one user is logged and the loop moves on to the next.
pub async fn refresh_recent_users(
    db: &SchedulerDb,
    config: &Config,
) -> Result<RefreshStats, WorkerError> {
    let start = Instant::now();
    debug!("Starting priority refresh cycle");

    let since = Utc::now() - Duration::hours(ACTIVITY_LOOKBACK_HOURS);
    let user_ids = exercises::recently_active_users(db.pool(), since).await?;

    let mut stats = RefreshStats {
        users_seen: user_ids.len(),
        ..Default::default()
    };

    for user_id in &user_ids {
        if let Err(e) = update_priorities(db, config, user_id).await {
            stats.users_failed += 1;
            error!(user_id, error = %e, "Priority update failed for user");
        }
    }

    stats.duration_secs = start.elapsed().as_secs_f64();
    info!(
        users_seen = stats.users_seen,
        users_failed = stats.users_failed,
        duration_secs = format!("{:.2}", stats.duration_secs),
        "Priority refresh completed"
    );

    Ok(stats)
}
