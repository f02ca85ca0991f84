//! Dashboard integration tests
//!
//! Builds tutor and student dashboards from data served by the in-memory
//! backend and checks both renderings.

mod common;

use chrono::FixedOffset;
use tutorhub_client::{HttpTutoringClient, SessionFilter};
use tutorhub_core::{
    compute_student_stats, compute_tutor_stats, normalize_availability, SessionContext,
    TutorStats,
};
use tutorhub_dashboard::{json::JsonGenerator, Dashboard, DashboardStats, MarkdownGenerator};

use common::{at, Backend};

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset")
}

#[tokio::test]
async fn test_tutor_stats_from_service_data() {
    let (base, _state, _handle) = common::spawn(Backend::seeded()).await;
    let client = HttpTutoringClient::new(&base, SessionContext::anonymous()).unwrap();

    let sessions = client
        .get_sessions(&SessionFilter::for_tutor("tutor-1"))
        .await
        .unwrap();
    let stats = compute_tutor_stats("tutor-1", &sessions);

    assert_eq!(
        stats,
        TutorStats {
            average_rating: 4.5,
            total_sessions: 2,
            total_hours: 2.5,
            active_students: 3,
        }
    );

    let student = compute_student_stats("student-1", &sessions);
    assert_eq!(student.total_sessions, 1);
    assert_eq!(student.upcoming_sessions, 0);
}

#[tokio::test]
async fn test_tutor_dashboard_renders() {
    let (base, _state, _handle) = common::spawn(Backend::seeded()).await;
    let client = HttpTutoringClient::new(&base, SessionContext::anonymous()).unwrap();

    let sessions = client
        .get_sessions(&SessionFilter::for_tutor("tutor-1"))
        .await
        .unwrap();
    let slots = client.get_availability("tutor-1").await.unwrap();
    let availability = normalize_availability(&slots, utc()).unwrap();
    let now = at(2026, 1, 4, 12, 0);

    let dashboard = Dashboard::for_tutor("tutor-1", "Grace", &sessions, Some(availability), now);

    assert!(matches!(dashboard.stats, DashboardStats::Tutor(_)));
    assert_eq!(dashboard.sessions.pending.len(), 1);
    assert_eq!(dashboard.sessions.completed.len(), 2);
    assert_eq!(dashboard.sessions.closed.len(), 1);

    let markdown = MarkdownGenerator::new(&dashboard).generate();
    assert!(markdown.contains("# Tutor Dashboard: Grace"));
    assert!(markdown.contains("| Average Rating | 4.5 / 5 |"));
    assert!(markdown.contains("| Monday | 09:00-10:00, 10:00-11:00 |"));
    assert!(markdown.contains("- Tue 2:00 PM-2:30 PM"));

    let json = JsonGenerator::new(&dashboard).generate().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["stats"]["activeStudents"], 3);
    assert_eq!(value["availability"]["weeklyGrid"]["Tuesday"][0], "14:00-14:30");
}

#[tokio::test]
async fn test_student_dashboard_in_local_offset() {
    let (base, _state, _handle) = common::spawn(Backend::seeded()).await;
    let client = HttpTutoringClient::new(&base, SessionContext::anonymous()).unwrap();

    let sessions = client
        .get_sessions(&SessionFilter::for_student("student-1"))
        .await
        .unwrap();
    let dashboard = Dashboard::for_student("student-1", "Ada", &sessions, at(2026, 1, 4, 12, 0));

    let markdown = MarkdownGenerator::new(&dashboard)
        .with_offset(FixedOffset::east_opt(9 * 3600).expect("UTC+9"))
        .generate();

    assert!(markdown.contains("# Student Dashboard: Ada"));
    assert!(markdown.contains("| Tutor | Where |"));
    // session-c starts 2026-01-08 09:00 UTC, i.e. 18:00 in UTC+9.
    assert!(markdown.contains("| Thu 2026-01-08 18:00-19:00 |"));
    assert!(!markdown.contains("## Weekly Availability"));
}
