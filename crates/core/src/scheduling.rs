//! Priority bounds and the pending-queue ordering rule.
//!
//! Pending jobs are served by priority (higher first), then by submission
//! time (earlier first). The job id breaks exact timestamp ties so the order
//! is total and identical in SQL (`ORDER BY priority DESC, created_at ASC,
//! id ASC`) and in memory.

use std::cmp::Ordering;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Priority constants
// ---------------------------------------------------------------------------

/// Highest accepted priority. Dispatched before all others.
pub const PRIORITY_MAX: i32 = 10;

/// Priority used when a submission omits one.
pub const PRIORITY_NORMAL: i32 = 0;

/// Lowest accepted priority. Dispatched last.
pub const PRIORITY_MIN: i32 = -10;

pub fn validate_priority(priority: i32) -> Result<(), CoreError> {
    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
        return Err(CoreError::InvalidRequest(format!(
            "Priority must be between {PRIORITY_MIN} and {PRIORITY_MAX}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// The fields that decide a pending job's place in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueKey {
    pub priority: i32,
    pub created_at: Timestamp,
    pub id: DbId,
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl QueueKey {
    /// True if `self` is served before `other`.
    pub fn sorts_before(&self, other: &QueueKey) -> bool {
        self < other
    }
}

/// 1-based queue position of `target` among `pending` keys: the number of
/// keys that sort strictly before it, plus one.
///
/// `target` need not be in `pending`; it is never counted against itself.
pub fn position_among<'a, I>(target: &QueueKey, pending: I) -> i64
where
    I: IntoIterator<Item = &'a QueueKey>,
{
    let ahead = pending
        .into_iter()
        .filter(|k| k.sorts_before(target))
        .count();
    ahead as i64 + 1
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn key(id: DbId, priority: i32, secs: i64) -> QueueKey {
        QueueKey {
            priority,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::seconds(secs),
            id,
        }
    }

    #[test]
    fn higher_priority_first() {
        let mut keys = vec![key(1, 0, 0), key(2, 5, 10)];
        keys.sort();
        assert_eq!(keys[0].id, 2);
    }

    #[test]
    fn earlier_submission_first_on_equal_priority() {
        let mut keys = vec![key(2, 3, 20), key(1, 3, 10), key(3, 3, 30)];
        keys.sort();
        let ids: Vec<_> = keys.iter().map(|k| k.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn id_breaks_identical_timestamps() {
        let mut keys = vec![key(9, 0, 0), key(4, 0, 0)];
        keys.sort();
        assert_eq!(keys[0].id, 4);
    }

    #[test]
    fn inserting_lower_priority_keeps_existing_order() {
        let mut keys = vec![key(1, 5, 0), key(2, 0, 1), key(3, 0, 2)];
        keys.sort();
        let before: Vec<_> = keys.iter().map(|k| k.id).collect();

        keys.push(key(4, -5, 3));
        keys.sort();
        let after: Vec<_> = keys
            .iter()
            .map(|k| k.id)
            .filter(|id| *id != 4)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn position_counts_strictly_ahead() {
        let target = key(2, 0, 10);
        let pending = [key(1, 0, 0), target, key(3, 0, 20), key(4, 1, 30)];
        // Ahead: 1 (earlier, same priority) and 4 (higher priority).
        assert_eq!(position_among(&target, &pending), 3);
    }

    #[test]
    fn position_grows_when_higher_or_equal_priority_inserted_ahead() {
        let target = key(10, 0, 100);
        let mut pending = vec![target];
        assert_eq!(position_among(&target, &pending), 1);

        pending.push(key(11, 1, 200));
        assert_eq!(position_among(&target, &pending), 2);

        // Equal priority but submitted later: behind, so no change.
        pending.push(key(12, 0, 300));
        assert_eq!(position_among(&target, &pending), 2);

        pending.push(key(13, 0, 50));
        assert_eq!(position_among(&target, &pending), 3);
    }

    #[test]
    fn position_stable_when_jobs_behind_change() {
        let target = key(1, 5, 0);
        let mut pending = vec![target, key(2, 0, 1)];
        assert_eq!(position_among(&target, &pending), 1);
        pending.push(key(3, -10, 2));
        assert_eq!(position_among(&target, &pending), 1);
        pending.retain(|k| k.id != 2);
        assert_eq!(position_among(&target, &pending), 1);
    }

    #[test]
    fn priority_bounds() {
        assert!(validate_priority(PRIORITY_MIN).is_ok());
        assert!(validate_priority(PRIORITY_MAX).is_ok());
        assert!(validate_priority(11).is_err());
        assert!(validate_priority(-11).is_err());
    }
}
