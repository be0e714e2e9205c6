//! Visit records and the visit status lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Visit status.
///
/// Any status may move to any other. The only rule attached to the lifecycle
/// is that a cancelled visit carries a non-empty cancellation reason.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    /// Booked, not yet attended (initial status)
    #[default]
    Scheduled,
    /// Attended
    Completed,
    /// Cancelled, with a reason
    Cancelled,
}

impl VisitStatus {
    pub const ALL: [VisitStatus; 3] = [
        VisitStatus::Scheduled,
        VisitStatus::Completed,
        VisitStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Scheduled => "scheduled",
            VisitStatus::Completed => "completed",
            VisitStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string that is not one of the three known statuses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown visit status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for VisitStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(VisitStatus::Scheduled),
            "completed" => Ok(VisitStatus::Completed),
            "cancelled" => Ok(VisitStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Violations of the visit record invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisitError {
    #[error("Cancellation reason is required when the visit is cancelled")]
    MissingCancellationReason,

    #[error("Invalid time format (expected HH:MM): {0}")]
    InvalidTimeFormat(String),

    #[error("End time {end} must be after start time {start}")]
    EndNotAfterStart { start: String, end: String },
}

/// A single hygienist visit for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitRecord {
    /// Store-assigned identifier
    pub id: i64,
    /// Visited patient
    pub patient_id: i64,
    /// Attending hygienist
    pub hygienist_id: i64,
    /// Calendar day of the visit
    pub visit_date: NaiveDate,
    /// Start time, HH:MM
    pub start_time: Option<String>,
    /// End time, HH:MM
    pub end_time: Option<String>,
    pub status: VisitStatus,
    /// Present only while cancelled
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// Fields for creating a visit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitInput {
    pub patient_id: i64,
    pub hygienist_id: i64,
    pub visit_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: VisitStatus,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
}

impl VisitInput {
    /// A scheduled visit with no times or notes.
    pub fn scheduled(patient_id: i64, hygienist_id: i64, visit_date: NaiveDate) -> Self {
        Self {
            patient_id,
            hygienist_id,
            visit_date,
            start_time: None,
            end_time: None,
            status: VisitStatus::Scheduled,
            cancellation_reason: None,
            notes: None,
        }
    }

    pub fn with_times(mut self, start: &str, end: &str) -> Self {
        self.start_time = Some(start.to_string());
        self.end_time = Some(end.to_string());
        self
    }

    pub fn with_status(mut self, status: VisitStatus, reason: Option<&str>) -> Self {
        self.status = status;
        self.cancellation_reason = reason.map(str::to_string);
        self
    }
}

/// Partial update for a visit record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VisitPatch {
    pub patient_id: Option<i64>,
    pub hygienist_id: Option<i64>,
    pub visit_date: Option<NaiveDate>,
    pub start_time: Option<Option<String>>,
    pub end_time: Option<Option<String>>,
    pub status: Option<VisitStatus>,
    pub cancellation_reason: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl VisitRecord {
    /// Build an unsaved record from input. The store assigns `id`.
    pub fn from_input(input: &VisitInput) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let mut record = Self {
            id: 0,
            patient_id: input.patient_id,
            hygienist_id: input.hygienist_id,
            visit_date: input.visit_date,
            start_time: normalize_text(input.start_time.as_deref()),
            end_time: normalize_text(input.end_time.as_deref()),
            status: input.status,
            cancellation_reason: normalize_text(input.cancellation_reason.as_deref()),
            notes: normalize_text(input.notes.as_deref()),
            created_at: now.clone(),
            updated_at: now,
        };
        record.clear_reason_unless_cancelled();
        record
    }

    /// Apply a partial update. Status changes go through the same rule as
    /// [`VisitRecord::transition_to`], but validation is left to
    /// [`VisitRecord::check_invariants`] so the caller sees every field at once.
    pub fn apply(&mut self, patch: &VisitPatch) {
        if let Some(patient_id) = patch.patient_id {
            self.patient_id = patient_id;
        }
        if let Some(hygienist_id) = patch.hygienist_id {
            self.hygienist_id = hygienist_id;
        }
        if let Some(date) = patch.visit_date {
            self.visit_date = date;
        }
        if let Some(start) = &patch.start_time {
            self.start_time = normalize_text(start.as_deref());
        }
        if let Some(end) = &patch.end_time {
            self.end_time = normalize_text(end.as_deref());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(reason) = &patch.cancellation_reason {
            self.cancellation_reason = normalize_text(reason.as_deref());
        }
        if let Some(notes) = &patch.notes {
            self.notes = normalize_text(notes.as_deref());
        }
        self.clear_reason_unless_cancelled();
    }

    /// Move to `status`. Entering `cancelled` needs a non-empty reason;
    /// every other status drops the reason. On error the record is unchanged.
    pub fn transition_to(
        &mut self,
        status: VisitStatus,
        reason: Option<&str>,
    ) -> Result<(), VisitError> {
        match status {
            VisitStatus::Cancelled => {
                let reason = normalize_text(reason).ok_or(VisitError::MissingCancellationReason)?;
                self.cancellation_reason = Some(reason);
            }
            VisitStatus::Scheduled | VisitStatus::Completed => {
                self.cancellation_reason = None;
            }
        }
        self.status = status;
        Ok(())
    }

    /// Check the record-level invariants.
    pub fn check_invariants(&self) -> Result<(), VisitError> {
        if self.status == VisitStatus::Cancelled && self.cancellation_reason.is_none() {
            return Err(VisitError::MissingCancellationReason);
        }

        let start = self.start_time.as_deref().map(parse_time).transpose()?;
        let end = self.end_time.as_deref().map(parse_time).transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                return Err(VisitError::EndNotAfterStart {
                    start: self.start_time.clone().unwrap_or_default(),
                    end: self.end_time.clone().unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    /// Visit length in minutes, when both times are present and ordered.
    pub fn duration_minutes(&self) -> Option<i64> {
        visit_duration_minutes(self.start_time.as_deref(), self.end_time.as_deref())
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    fn clear_reason_unless_cancelled(&mut self) {
        if self.status != VisitStatus::Cancelled {
            self.cancellation_reason = None;
        }
    }
}

/// Parse a strict 24h `HH:MM` time.
pub fn parse_time(value: &str) -> Result<NaiveTime, VisitError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(VisitError::InvalidTimeFormat(value.to_string()));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| VisitError::InvalidTimeFormat(value.to_string()))
}

/// Minutes between two `HH:MM` times. `None` when either is missing or
/// malformed, or when `end` is not strictly after `start`.
pub fn visit_duration_minutes(start: Option<&str>, end: Option<&str>) -> Option<i64> {
    let start = parse_time(start?).ok()?;
    let end = parse_time(end?).ok()?;
    let minutes = (end - start).num_minutes();
    (minutes > 0).then_some(minutes)
}

fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
