use tracing::{debug, info};

use crate::arts::{EXCLUDED_PRIORITY, MAX_PRIORITY};
use crate::config::Config;
use crate::db::operations::{bookmarks, exercises, priorities};
use crate::db::SchedulerDb;
use crate::error::SchedulerError;

/// Recomputes the priority of every fit-for-study bookmark the user owns.
///
/// A bookmark that was never exercised gets the maximum sentinel so brand-new
/// items surface first. One whose latest exercise carries no usable timing
/// gets the excluded sentinel and never resurfaces while that holds. Anything
/// else goes through the algorithm its id is assigned to.
///
/// Each upsert commits on its own, so a failure partway leaves earlier items
/// updated; the error return tells the caller the batch did not complete.
/// Safe to call repeatedly.
pub async fn update_priorities(
    db: &SchedulerDb,
    config: &Config,
    user_id: &str,
) -> Result<(), SchedulerError> {
    let pool = db.pool();

    let bookmarks = bookmarks::fit_for_study_bookmarks(pool, user_id).await?;
    if bookmarks.is_empty() {
        debug!(user_id, "no bookmarks fit for study, skipping");
        return Ok(());
    }

    let latest = exercises::latest_exercises(pool, user_id).await?;
    let max_trials = latest
        .values()
        .filter(|exercise| bookmarks.iter().any(|b| b.id == exercise.bookmark_id))
        .map(|exercise| exercise.id)
        .max()
        .unwrap_or(0);

    let stats = exercises::source_latency_stats(
        pool,
        config.latency_stats_window_days,
        config.latency_outlier_ceiling_ms,
    )
    .await?;

    let ab_testing = config.ab_testing();

    let mut updated = 0usize;
    for bookmark in &bookmarks {
        let priority = match latest.get(&bookmark.id) {
            Some(exercise) if exercise.solving_speed > 0 => ab_testing
                .wrapper_for(bookmark.id)
                .calculate(Some(exercise), max_trials, &stats)?,
            Some(_) => EXCLUDED_PRIORITY,
            None => MAX_PRIORITY,
        };

        priorities::upsert_priority(
            pool,
            bookmark.id,
            priority,
            config.priority_upsert_max_attempts,
        )
        .await?;
        updated += 1;
    }

    info!(user_id, updated, "bookmark priorities recomputed");
    Ok(())
}
