//! TutorHub dashboards
//!
//! Assembles what a tutor or a student sees on their dashboard: headline
//! statistics, sessions grouped by where they stand, and, for tutors, the
//! weekly availability grid. Dashboards serialize to JSON for programmatic
//! access or render to Markdown for people.
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - compact or pretty JSON
//! - [`MarkdownGenerator`] - human-readable Markdown
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tutorhub_dashboard::{json::JsonGenerator, Dashboard};
//!
//! let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
//! let dashboard = Dashboard::for_student("student-1", "Ada", &[], now);
//!
//! let json = JsonGenerator::new(&dashboard).generate().unwrap();
//! assert!(json.contains(r#""role":"STUDENT""#));
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tutorhub_core::{
    classify, compute_student_stats, compute_tutor_stats, BookingSession, NormalizedAvailability,
    Role, SessionBuckets, StudentStats, TutorStats,
};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while producing a dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Failed to serialize the dashboard to JSON.
    #[error("failed to serialize dashboard: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to write the dashboard file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;

// ============================================================================
// Dashboard
// ============================================================================

/// Headline numbers, shaped by whose dashboard it is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DashboardStats {
    /// Tutor metrics.
    Tutor(TutorStats),
    /// Student metrics.
    Student(StudentStats),
}

/// Everything one user's dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Owner of the dashboard.
    pub user_id: String,
    /// Display name of the owner.
    pub user_name: String,
    /// Side the owner is on.
    pub role: Role,
    /// Instant used to split upcoming sessions from past ones.
    pub generated_at: DateTime<Utc>,
    /// Headline metrics.
    pub stats: DashboardStats,
    /// The owner's sessions grouped by status and time.
    pub sessions: SessionBuckets,
    /// Weekly availability, tutors only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<NormalizedAvailability>,
}

impl Dashboard {
    /// Builds a tutor dashboard from the tutor's sessions and availability.
    #[must_use]
    pub fn for_tutor(
        tutor_id: &str,
        name: &str,
        sessions: &[BookingSession],
        availability: Option<NormalizedAvailability>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: tutor_id.to_string(),
            user_name: name.to_string(),
            role: Role::Tutor,
            generated_at: now,
            stats: DashboardStats::Tutor(compute_tutor_stats(tutor_id, sessions)),
            sessions: classify(sessions, Role::Tutor, tutor_id, now),
            availability,
        }
    }

    /// Builds a student dashboard from the student's sessions.
    #[must_use]
    pub fn for_student(
        student_id: &str,
        name: &str,
        sessions: &[BookingSession],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: student_id.to_string(),
            user_name: name.to_string(),
            role: Role::Student,
            generated_at: now,
            stats: DashboardStats::Student(compute_student_stats(student_id, sessions)),
            sessions: classify(sessions, Role::Student, student_id, now),
            availability: None,
        }
    }

    /// Number of sessions waiting on someone to act.
    #[must_use]
    pub fn action_items(&self) -> usize {
        self.sessions.pending.len() + self.sessions.awaiting_completion.len()
    }
}
