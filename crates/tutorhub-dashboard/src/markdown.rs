//! Markdown dashboard rendering.
//!
//! [`MarkdownGenerator`] turns a [`Dashboard`] into a Markdown document with
//! a summary table, one table per session group and, for tutors, the weekly
//! availability grid. Session times are shown in a fixed display offset.
//!
//! # Example
//!
//! ```rust
//! use chrono::{FixedOffset, Utc};
//! use tutorhub_dashboard::{Dashboard, MarkdownGenerator};
//!
//! let dashboard = Dashboard::for_tutor("tutor-1", "Grace", &[], None, Utc::now());
//! let markdown = MarkdownGenerator::new(&dashboard)
//!     .with_offset(FixedOffset::west_opt(5 * 3600).unwrap())
//!     .generate();
//! assert!(markdown.starts_with("# Tutor Dashboard: Grace"));
//! ```

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tutorhub_core::{
    BookingSession, NormalizedAvailability, Role, SessionType, StudentStats, TutorStats,
};

use crate::{Dashboard, DashboardStats};

/// Renders dashboards as Markdown.
pub struct MarkdownGenerator<'a> {
    dashboard: &'a Dashboard,
    offset: FixedOffset,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a generator that shows times in UTC.
    #[must_use]
    pub fn new(dashboard: &'a Dashboard) -> Self {
        Self {
            dashboard,
            offset: utc(),
        }
    }

    /// Shows session times in `offset` instead of UTC.
    #[must_use]
    pub const fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Generates the complete document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_sessions(&mut output);
        self.write_availability(&mut output);
        self.write_footer(&mut output);

        output
    }

    fn write_title(&self, output: &mut String) {
        let heading = match self.dashboard.role {
            Role::Tutor => "Tutor Dashboard",
            Role::Student => "Student Dashboard",
        };
        let _ = writeln!(
            output,
            "# {heading}: {}\n",
            escape_markdown(&self.dashboard.user_name)
        );
    }

    fn write_summary(&self, output: &mut String) {
        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");

        match &self.dashboard.stats {
            DashboardStats::Tutor(stats) => write_tutor_rows(output, stats),
            DashboardStats::Student(stats) => write_student_rows(output, stats),
        }

        let _ = writeln!(
            output,
            "| Needs Attention | {} |",
            self.dashboard.action_items()
        );
        let _ = writeln!(output);
    }

    fn write_sessions(&self, output: &mut String) {
        let _ = writeln!(output, "## Sessions\n");

        let buckets = &self.dashboard.sessions;
        if buckets.is_empty() {
            let _ = writeln!(output, "*No sessions yet.*\n");
            return;
        }

        self.write_session_group(output, "Pending Requests", &buckets.pending);
        self.write_session_group(output, "Upcoming", &buckets.upcoming);
        self.write_session_group(output, "Awaiting Completion", &buckets.awaiting_completion);
        self.write_session_group(output, "Completed", &buckets.completed);
        self.write_session_group(output, "Rejected or Canceled", &buckets.closed);
    }

    fn write_session_group(&self, output: &mut String, title: &str, sessions: &[BookingSession]) {
        let _ = writeln!(output, "### {title} ({})\n", sessions.len());

        if sessions.is_empty() {
            let _ = writeln!(output, "*None*\n");
            return;
        }

        let counterpart = match self.dashboard.role {
            Role::Tutor => "Student",
            Role::Student => "Tutor",
        };
        let _ = writeln!(output, "| When | Subject | Type | {counterpart} | Where |");
        let _ = writeln!(
            output,
            "|------|---------|------|{}|-------|",
            "-".repeat(counterpart.len() + 2)
        );
        for session in sessions {
            let _ = writeln!(output, "{}", self.session_row(session));
        }
        let _ = writeln!(output);
    }

    fn session_row(&self, session: &BookingSession) -> String {
        let counterpart = match self.dashboard.role {
            Role::Tutor => &session.student_id,
            Role::Student => &session.tutor_id,
        };
        format!(
            "| {} | {} | {} | {} | {} |",
            format_when(&session.start_time, &session.end_time, self.offset),
            escape_markdown(&session.subject),
            session_type_label(session.session_type),
            escape_markdown(counterpart),
            escape_markdown(&session.location_or_link),
        )
    }

    fn write_availability(&self, output: &mut String) {
        if self.dashboard.role != Role::Tutor {
            return;
        }
        let _ = writeln!(output, "## Weekly Availability\n");

        match &self.dashboard.availability {
            Some(availability) if !availability.weekly_grid.is_empty() => {
                write_grid(output, availability);
            }
            _ => {
                let _ = writeln!(output, "*No open slots.*\n");
            }
        }
    }

    fn write_footer(&self, output: &mut String) {
        let _ = writeln!(output, "---");
        let _ = writeln!(
            output,
            "*Generated by TutorHub at {}*",
            format_timestamp(&self.dashboard.generated_at)
        );
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn write_tutor_rows(output: &mut String, stats: &TutorStats) {
    let _ = writeln!(output, "| Average Rating | {} |", format_rating(stats.average_rating));
    let _ = writeln!(output, "| Completed Sessions | {} |", stats.total_sessions);
    let _ = writeln!(output, "| Hours Taught | {:.1} |", stats.total_hours);
    let _ = writeln!(output, "| Active Students | {} |", stats.active_students);
}

fn write_student_rows(output: &mut String, stats: &StudentStats) {
    let _ = writeln!(output, "| Completed Sessions | {} |", stats.total_sessions);
    let _ = writeln!(output, "| Upcoming Sessions | {} |", stats.upcoming_sessions);
    let _ = writeln!(output, "| Hours Attended | {:.1} |", stats.total_hours);
    let _ = writeln!(output, "| Average Rating | {} |", format_rating(stats.average_rating));
}

fn write_grid(output: &mut String, availability: &NormalizedAvailability) {
    let _ = writeln!(output, "| Day | Hours |");
    let _ = writeln!(output, "|-----|-------|");
    for (day, buckets) in availability.weekly_grid.iter() {
        if buckets.is_empty() {
            continue;
        }
        let _ = writeln!(
            output,
            "| {} | {} |",
            tutorhub_core::weekday_name(day),
            buckets.join(", ")
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "### Open Slots\n");
    for range in &availability.readable_ranges {
        let _ = writeln!(output, "- {range}");
    }
    let _ = writeln!(output);
}

/// `0` means nothing has been rated yet.
fn format_rating(rating: f64) -> String {
    if rating > 0.0 {
        format!("{rating:.1} / 5")
    } else {
        "n/a".to_string()
    }
}

/// Formats a session window, e.g. "Mon 2026-01-05 09:00-10:00".
fn format_when(start: &DateTime<Utc>, end: &DateTime<Utc>, offset: FixedOffset) -> String {
    let start = start.with_timezone(&offset);
    let end = end.with_timezone(&offset);
    format!("{}-{}", start.format("%a %Y-%m-%d %H:%M"), end.format("%H:%M"))
}

/// Format: "YYYY-MM-DD HH:MM:SS UTC"
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

const fn session_type_label(session_type: SessionType) -> &'static str {
    match session_type {
        SessionType::Online => "Online",
        SessionType::InPerson => "In person",
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Escapes special Markdown characters so user text renders literally.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
