//! Tutor and student performance metrics.
//!
//! Both views run the same reduction. A [`Perspective`] decides which
//! sessions belong to the subject and derives the one field that differs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::session::{BookingSession, Role, SessionStatus};

/// Totals shared by every view, computed over completed sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTotals {
    /// Number of completed sessions.
    pub total_sessions: u32,
    /// Mean rating, one decimal place, `0` when nothing is rated.
    pub average_rating: f64,
    /// Sum of durations in hours, one decimal place.
    pub total_hours: f64,
}

/// Tutor dashboard metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorStats {
    /// Mean rating over completed sessions.
    pub average_rating: f64,
    /// Number of completed sessions.
    pub total_sessions: u32,
    /// Hours taught.
    pub total_hours: f64,
    /// Distinct students across all of the tutor's sessions.
    pub active_students: u32,
}

/// Student dashboard metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    /// Number of completed sessions.
    pub total_sessions: u32,
    /// Number of confirmed sessions.
    pub upcoming_sessions: u32,
    /// Hours attended.
    pub total_hours: f64,
    /// Mean rating over completed sessions.
    pub average_rating: f64,
}

/// Selects the subject's sessions and shapes the final statistics.
pub trait Perspective {
    /// Statistics produced for this view.
    type Stats;

    /// Returns `true` if `session` belongs to the subject.
    fn includes(&self, session: &BookingSession) -> bool;

    /// Combines the shared totals with the view-specific field.
    ///
    /// `sessions` holds every session of the subject, in any status.
    fn finish(&self, totals: CompletedTotals, sessions: &[&BookingSession]) -> Self::Stats;
}

/// Statistics from the tutor's side.
#[derive(Debug, Clone, Copy)]
pub struct TutorView<'a>(pub &'a str);

/// Statistics from the student's side.
#[derive(Debug, Clone, Copy)]
pub struct StudentView<'a>(pub &'a str);

impl Perspective for TutorView<'_> {
    type Stats = TutorStats;

    fn includes(&self, session: &BookingSession) -> bool {
        session.involves(Role::Tutor, self.0)
    }

    fn finish(&self, totals: CompletedTotals, sessions: &[&BookingSession]) -> TutorStats {
        let students: HashSet<&str> = sessions.iter().map(|s| s.student_id.as_str()).collect();
        TutorStats {
            average_rating: totals.average_rating,
            total_sessions: totals.total_sessions,
            total_hours: totals.total_hours,
            active_students: saturating_u32(students.len()),
        }
    }
}

impl Perspective for StudentView<'_> {
    type Stats = StudentStats;

    fn includes(&self, session: &BookingSession) -> bool {
        session.involves(Role::Student, self.0)
    }

    fn finish(&self, totals: CompletedTotals, sessions: &[&BookingSession]) -> StudentStats {
        let upcoming = sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Confirmed)
            .count();
        StudentStats {
            total_sessions: totals.total_sessions,
            upcoming_sessions: saturating_u32(upcoming),
            total_hours: totals.total_hours,
            average_rating: totals.average_rating,
        }
    }
}

/// Runs the shared reduction for `perspective` over `sessions`.
pub fn aggregate<P: Perspective>(perspective: &P, sessions: &[BookingSession]) -> P::Stats {
    let own: Vec<&BookingSession> = sessions.iter().filter(|s| perspective.includes(s)).collect();
    let totals = completed_totals(&own);
    perspective.finish(totals, &own)
}

/// Computes tutor metrics for `tutor_id`.
///
/// # Examples
///
/// ```
/// use tutorhub_core::{compute_tutor_stats, TutorStats};
///
/// assert_eq!(compute_tutor_stats("tutor-1", &[]), TutorStats::default());
/// ```
pub fn compute_tutor_stats(tutor_id: &str, sessions: &[BookingSession]) -> TutorStats {
    aggregate(&TutorView(tutor_id), sessions)
}

/// Computes student metrics for `student_id`.
pub fn compute_student_stats(student_id: &str, sessions: &[BookingSession]) -> StudentStats {
    aggregate(&StudentView(student_id), sessions)
}

fn completed_totals(sessions: &[&BookingSession]) -> CompletedTotals {
    let completed: Vec<&BookingSession> = sessions
        .iter()
        .copied()
        .filter(|s| s.status == SessionStatus::Completed)
        .collect();

    let ratings: Vec<f64> = completed.iter().filter_map(|s| s.rating).collect();
    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
        round_one_decimal(mean)
    };

    let minutes: u64 = completed
        .iter()
        .map(|s| u64::from(s.duration.unwrap_or(0)))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let total_hours = round_one_decimal(minutes as f64 / 60.0);

    CompletedTotals {
        total_sessions: saturating_u32(completed.len()),
        average_rating,
        total_hours,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
