//! Job status enum and the lifecycle state machine.
//!
//! Everything here is pure: transitions take the current [`JobLifecycle`]
//! plus an explicit `now` and return the next lifecycle or a
//! [`CoreError::IllegalTransition`]. Persisting the result atomically is the
//! store's job.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Status ID type matching the SMALLINT `job_statuses` lookup table.
pub type StatusId = i16;

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Job execution status. Discriminants match the `job_statuses` seed rows.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
    Cancelled = 5,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed, failed and cancelled jobs carry `processing_completed_at`.
    pub fn is_finished(self) -> bool {
        match self {
            Self::Completed | Self::Failed | Self::Cancelled => true,
            Self::Pending | Self::Processing => false,
        }
    }

    /// Statuses reachable from `self` in one step.
    ///
    /// `Failed -> Pending` is listed because an operator retry is legal in
    /// principle; the attempt cap is checked separately by [`JobLifecycle::retry`].
    pub fn valid_transitions(self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Failed => &[Self::Pending],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    pub fn can_transition(self, to: JobStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Validate a single step, producing a typed error for illegal pairs.
    pub fn validate_transition(self, to: JobStatus) -> Result<(), CoreError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            let reason = if self.valid_transitions().is_empty() {
                format!("{self} is terminal")
            } else {
                format!("{to} is not reachable from {self}")
            };
            Err(CoreError::IllegalTransition {
                from: self,
                to,
                reason,
            })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| {
                CoreError::InvalidRequest(format!(
                    "Invalid status '{s}'. Must be one of: pending, processing, completed, failed, cancelled"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// JobLifecycle
// ---------------------------------------------------------------------------

/// The mutable bookkeeping of a job: status, attempts and processing times.
///
/// Only the transition methods below produce new values; stores persist the
/// returned struct with a status-conditional update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobLifecycle {
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub processing_started_at: Option<Timestamp>,
    pub processing_completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl JobLifecycle {
    /// Lifecycle of a freshly admitted job.
    pub fn new_pending(max_attempts: i32) -> Self {
        Self {
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts,
            processing_started_at: None,
            processing_completed_at: None,
            error_message: None,
        }
    }

    /// Claim: `pending -> processing`, incrementing the attempt counter.
    pub fn mark_processing(&self, now: Timestamp) -> Result<Self, CoreError> {
        self.status.validate_transition(JobStatus::Processing)?;
        if self.attempts >= self.max_attempts {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                to: JobStatus::Processing,
                reason: format!(
                    "attempts ({}) >= max_attempts ({})",
                    self.attempts, self.max_attempts
                ),
            });
        }
        Ok(Self {
            status: JobStatus::Processing,
            attempts: self.attempts + 1,
            processing_started_at: Some(now),
            processing_completed_at: None,
            ..self.clone()
        })
    }

    /// `processing -> completed`. Clears any error left by an earlier attempt.
    pub fn mark_completed(&self, now: Timestamp) -> Result<Self, CoreError> {
        self.status.validate_transition(JobStatus::Completed)?;
        Ok(Self {
            status: JobStatus::Completed,
            processing_completed_at: Some(now),
            error_message: None,
            ..self.clone()
        })
    }

    /// `processing -> failed`, storing the worker's message.
    pub fn mark_failed(&self, message: &str, now: Timestamp) -> Result<Self, CoreError> {
        self.status.validate_transition(JobStatus::Failed)?;
        Ok(Self {
            status: JobStatus::Failed,
            processing_completed_at: Some(now),
            error_message: Some(message.to_string()),
            ..self.clone()
        })
    }

    /// `pending | processing -> cancelled`. Does not interrupt a render in
    /// flight; it only makes later reports for this job illegal.
    pub fn mark_cancelled(&self, now: Timestamp) -> Result<Self, CoreError> {
        self.status.validate_transition(JobStatus::Cancelled)?;
        Ok(Self {
            status: JobStatus::Cancelled,
            processing_completed_at: Some(now),
            ..self.clone()
        })
    }

    /// Operator retry: `failed -> pending`, keeping the attempt counter so
    /// the cap still holds.
    pub fn retry(&self) -> Result<Self, CoreError> {
        self.status.validate_transition(JobStatus::Pending)?;
        if !self.has_attempts_left() {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                to: JobStatus::Pending,
                reason: format!(
                    "attempts ({}) >= max_attempts ({})",
                    self.attempts, self.max_attempts
                ),
            });
        }
        Ok(Self {
            status: JobStatus::Pending,
            processing_started_at: None,
            processing_completed_at: None,
            error_message: None,
            ..self.clone()
        })
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Wall-clock seconds between start and finish, when both are known.
    pub fn processing_duration_secs(&self) -> Option<f64> {
        match (self.processing_started_at, self.processing_completed_at) {
            (Some(start), Some(end)) => {
                Some((end - start).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        }
    }
}
