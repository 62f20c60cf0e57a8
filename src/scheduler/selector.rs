use std::collections::VecDeque;

use tracing::debug;

use crate::config::Config;
use crate::db::operations::bookmarks::{self, Bookmark};
use crate::db::operations::users;
use crate::db::SchedulerDb;
use crate::error::SchedulerError;

/// Picks the next study batch for the user, highest priority first, drawing
/// round-robin across the algorithm buckets so no single algorithm's score
/// scale dominates the batch and the A/B comparison stays balanced.
///
/// Zero eligible bookmarks is an empty batch, not an error.
pub async fn select_study_batch(
    db: &SchedulerDb,
    config: &Config,
    user_id: &str,
    desired_count: usize,
) -> Result<Vec<Bookmark>, SchedulerError> {
    let pool = db.pool();

    let Some(language_id) = users::get_learned_language(pool, user_id).await? else {
        debug!(user_id, "unknown user, empty study batch");
        return Ok(Vec::new());
    };

    let candidates = bookmarks::eligible_for_study(pool, user_id, &language_id).await?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let ab_testing = config.ab_testing();
    let total = candidates.len();
    let want = desired_count.min(total);

    let mut queues: Vec<VecDeque<Bookmark>> = ab_testing
        .partition(candidates)
        .into_iter()
        .map(VecDeque::from)
        .collect();

    let mut batch = Vec::with_capacity(want);
    let mut bucket = 0usize;
    while batch.len() < want {
        if queues.iter().all(VecDeque::is_empty) {
            break;
        }
        if let Some(bookmark) = queues[bucket].pop_front() {
            batch.push(bookmark);
        }
        bucket = (bucket + 1) % queues.len();
    }

    debug!(user_id, selected = batch.len(), "study batch selected");
    Ok(batch)
}
