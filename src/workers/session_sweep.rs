use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::db::operations::sessions::{self, SessionKind};
use crate::db::SchedulerDb;
use crate::sessions::force_close;

use super::WorkerError;

#[derive(Debug, Default)]
pub struct SweepStats {
    pub closed: usize,
    pub deleted: usize,
}

/// Closes active sessions whose last action is older than their kind's
/// timeout, with the usual grace extension. Degenerate sessions disappear.
pub async fn sweep_stale_sessions(
    db: &SchedulerDb,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<SweepStats, WorkerError> {
    debug!("Starting session sweep cycle");
    let mut stats = SweepStats::default();

    for kind in [SessionKind::Reading, SessionKind::Exercise] {
        let cutoff = now - kind.timeout(config);
        let stale = sessions::stale_active_sessions(db.pool(), kind, cutoff).await?;
        for session in stale {
            match force_close(db.pool(), config, session, now).await? {
                Some(_) => stats.closed += 1,
                None => stats.deleted += 1,
            }
        }
    }

    info!(
        closed = stats.closed,
        deleted = stats.deleted,
        "Session sweep completed"
    );
    Ok(stats)
}
