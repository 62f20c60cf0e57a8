use tracing::warn;

use crate::db::operations::bookmarks::Bookmark;

use super::wrapper::AlgorithmWrapper;
use super::{PriorityAlgorithm, ResponseTimeParams, StandardizedParams};

/// Deterministic partition of bookmarks across the competing algorithms:
/// a bookmark's numeric id modulo the roster size picks its algorithm, so
/// the assignment is stable for the lifetime of the item as long as the
/// roster keeps its size.
#[derive(Debug, Clone)]
pub struct AbTesting {
    wrappers: Vec<AlgorithmWrapper>,
}

impl Default for AbTesting {
    fn default() -> Self {
        Self {
            wrappers: vec![
                AlgorithmWrapper::new(PriorityAlgorithm::ResponseTime(
                    ResponseTimeParams::default(),
                )),
                AlgorithmWrapper::new(PriorityAlgorithm::StandardizedDeviation(
                    StandardizedParams::default(),
                )),
            ],
        }
    }
}

impl AbTesting {
    pub fn new(wrappers: Vec<AlgorithmWrapper>) -> Self {
        if wrappers.is_empty() {
            warn!("empty algorithm roster, falling back to the default pair");
            return Self::default();
        }
        Self { wrappers }
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    pub fn bucket(&self, bookmark_id: i64) -> usize {
        bookmark_id.rem_euclid(self.wrappers.len() as i64) as usize
    }

    pub fn wrapper_for(&self, bookmark_id: i64) -> &AlgorithmWrapper {
        &self.wrappers[self.bucket(bookmark_id)]
    }

    /// One bucket per roster entry, preserving the relative order of the
    /// input within each bucket.
    pub fn partition(&self, bookmarks: Vec<Bookmark>) -> Vec<Vec<Bookmark>> {
        let mut buckets: Vec<Vec<Bookmark>> = (0..self.wrappers.len()).map(|_| Vec::new()).collect();
        for bookmark in bookmarks {
            let bucket = self.bucket(bookmark.id);
            buckets[bucket].push(bookmark);
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn bookmark(id: i64) -> Bookmark {
        Bookmark {
            id,
            user_id: "u1".to_string(),
            language_id: "de".to_string(),
            fit_for_study: true,
            learned: false,
            starred: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn assignment_is_stable_per_id() {
        let ab = AbTesting::default();
        for id in 0..20 {
            assert_eq!(ab.bucket(id), ab.bucket(id));
            assert_eq!(ab.bucket(id), (id % 2) as usize);
        }
    }

    #[test]
    fn partition_preserves_relative_order() {
        let ab = AbTesting::default();
        let buckets = ab.partition(vec![bookmark(5), bookmark(3), bookmark(2), bookmark(1)]);
        assert_eq!(buckets.len(), 2);
        let odd_ids: Vec<i64> = buckets[1].iter().map(|b| b.id).collect();
        assert_eq!(odd_ids, vec![5, 3, 1]);
        let even_ids: Vec<i64> = buckets[0].iter().map(|b| b.id).collect();
        assert_eq!(even_ids, vec![2]);
    }

    #[test]
    fn empty_roster_falls_back_to_default() {
        let ab = AbTesting::new(Vec::new());
        assert_eq!(ab.len(), 2);
    }
}
