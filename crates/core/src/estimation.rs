//! Completion-time estimation for pending jobs.
//!
//! The estimate is a heuristic recomputed on every query: the mean observed
//! processing time of completed jobs in the same category, multiplied by the
//! job's queue position (its own render plus every render ahead of it).

use chrono::{DateTime, Duration, Utc};

use crate::types::Timestamp;

/// Assumed render duration when a category has no completed history.
pub const DEFAULT_PROCESSING_SECS: f64 = 300.0;

/// Mean of the observed durations, ignoring negative samples (clock skew).
///
/// Returns `None` when no usable sample exists.
pub fn average_duration_secs(durations: &[f64]) -> Option<f64> {
    let usable: Vec<f64> = durations
        .iter()
        .copied()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .collect();
    if usable.is_empty() {
        return None;
    }
    Some(usable.iter().sum::<f64>() / usable.len() as f64)
}

/// Estimate when a pending job at `position` (1-based) will finish.
///
/// `avg_secs` falls back to `fallback_secs` when no history exists.
pub fn estimate_completion(
    now: Timestamp,
    avg_secs: Option<f64>,
    fallback_secs: f64,
    position: i64,
) -> Timestamp {
    let per_job = avg_secs
        .filter(|s| s.is_finite() && *s >= 0.0)
        .unwrap_or(fallback_secs);
    let total_ms = ((per_job * position.max(1) as f64 * 1000.0).round() as i64).max(0);
    now.checked_add_signed(Duration::milliseconds(total_ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn average_of_empty_is_none() {
        assert_eq!(average_duration_secs(&[]), None);
    }

    #[test]
    fn average_skips_negative_samples() {
        assert_eq!(average_duration_secs(&[10.0, 20.0, -5.0]), Some(15.0));
    }

    #[test]
    fn fallback_used_without_history() {
        let eta = estimate_completion(now(), None, DEFAULT_PROCESSING_SECS, 1);
        assert_eq!(eta, now() + Duration::seconds(300));
    }

    #[test]
    fn eta_scales_with_position() {
        let eta = estimate_completion(now(), Some(60.0), DEFAULT_PROCESSING_SECS, 4);
        assert_eq!(eta, now() + Duration::seconds(240));
    }

    #[test]
    fn fractional_averages_keep_millisecond_precision() {
        let eta = estimate_completion(now(), Some(1.5), DEFAULT_PROCESSING_SECS, 3);
        assert_eq!(eta, now() + Duration::milliseconds(4500));
    }

    #[test]
    fn non_positive_position_treated_as_front_of_queue() {
        let eta = estimate_completion(now(), Some(10.0), DEFAULT_PROCESSING_SECS, 0);
        assert_eq!(eta, now() + Duration::seconds(10));
    }

    #[test]
    fn oversized_estimates_saturate() {
        let eta = estimate_completion(now(), Some(1e300), DEFAULT_PROCESSING_SECS, i64::MAX);
        assert_eq!(eta, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn negative_fallback_never_lands_in_the_past() {
        let eta = estimate_completion(now(), None, -50.0, 2);
        assert_eq!(eta, now());
    }
}
