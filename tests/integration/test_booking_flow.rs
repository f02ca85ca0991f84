//! End-to-end booking lifecycle tests
//!
//! A student books a slot, the tutor answers, and the session moves through
//! its states against the in-memory backend.

mod common;

use chrono::{Duration, Utc};
use tutorhub_client::{ClientError, HttpTutoringClient, SessionFilter};
use tutorhub_core::{
    BookingError, BookingRequest, BookingSession, Credential, MemoryCredentialStore,
    SessionContext, SessionStatus, SessionType, SlotStatus,
};

use common::{Backend, Shared, STUDENT_TOKEN, TUTOR_TOKEN};

fn client_with_token(base: &str, token: &str) -> HttpTutoringClient {
    let store = MemoryCredentialStore::with(Credential::new(token, Utc::now() + Duration::hours(1)), None);
    let session = SessionContext::start(store).expect("memory store never fails");
    HttpTutoringClient::new(base, session).expect("valid base URL")
}

fn monday_request() -> BookingRequest {
    BookingRequest::new(
        "slot-mon",
        "Hypothesis testing",
        SessionType::Online,
        "https://meet.example/ht",
        Some("Chapter 7 please".to_string()),
    )
    .expect("valid request")
}

async fn slot_status(state: &Shared, slot_id: &str) -> Option<SlotStatus> {
    state
        .lock()
        .await
        .slots
        .iter()
        .find(|s| s.id == slot_id)
        .map(|s| s.status)
}

/// A provisional local session is reconciled with the service's copy.
#[tokio::test]
async fn test_book_slot_reconciles_provisional_session() {
    let (base, state, _handle) = common::spawn(Backend::seeded()).await;
    let student = client_with_token(&base, STUDENT_TOKEN);

    let request = monday_request();
    let slots = student.get_availability("tutor-1").await.unwrap();
    let mut session = BookingSession::create(&request, &slots, "student-1").unwrap();

    assert!(session.is_provisional());
    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(session.tutor_id, "tutor-1");

    let confirmed = student.create_booking_session(&request).await.unwrap();
    session.reconcile(confirmed).unwrap();

    assert!(!session.is_provisional());
    assert_eq!(session.id, "session-1");
    assert_eq!(session.student_id, "student-1");
    assert_eq!(session.student_notes.as_deref(), Some("Chapter 7 please"));
    assert_eq!(slot_status(&state, "slot-mon").await, Some(SlotStatus::Booked));
}

/// A slot that is not available locally is rejected before any booking call.
#[tokio::test]
async fn test_booking_unavailable_slot_fails_locally() {
    let (base, state, _handle) = common::spawn(Backend::seeded()).await;
    let student = client_with_token(&base, STUDENT_TOKEN);

    let request = BookingRequest::new(
        "slot-wed",
        "Regression",
        SessionType::InPerson,
        "Library room 4",
        None,
    )
    .unwrap();
    let slots = student.get_availability("tutor-1").await.unwrap();

    let err = BookingSession::create(&request, &slots, "student-1").unwrap_err();
    assert!(matches!(err, BookingError::InvalidRequest { .. }));
    assert_eq!(state.lock().await.request_count(), 1);
}

/// Booking the same slot twice is refused by the service.
#[tokio::test]
async fn test_double_booking_conflicts() {
    let (base, _state, _handle) = common::spawn(Backend::seeded()).await;
    let student = client_with_token(&base, STUDENT_TOKEN);

    student.create_booking_session(&monday_request()).await.unwrap();
    let err = student
        .create_booking_session(&monday_request())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 409, .. }));
    assert!(err.is_user_error());
}

/// Pending -> Confirmed -> Completed, leaving each caller value untouched.
#[tokio::test]
async fn test_session_lifecycle() {
    let (base, _state, _handle) = common::spawn(Backend::seeded()).await;
    let student = client_with_token(&base, STUDENT_TOKEN);
    let tutor = client_with_token(&base, TUTOR_TOKEN);

    let pending = student.create_booking_session(&monday_request()).await.unwrap();

    let confirmed = tutor
        .update_session_status(&pending, SessionStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(pending.status, SessionStatus::Pending);
    assert_eq!(confirmed.status, SessionStatus::Confirmed);
    assert_eq!(confirmed.id, pending.id);

    let completed = tutor
        .update_session_status(&confirmed, SessionStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, SessionStatus::Completed);
    assert!(completed.is_terminal());

    let listed = student
        .get_sessions(&SessionFilter::for_student("student-1").with_status(SessionStatus::Completed))
        .await
        .unwrap();
    assert!(listed.iter().any(|s| s.id == pending.id));
}

/// Disallowed transitions never reach the network.
#[tokio::test]
async fn test_invalid_transition_is_not_sent() {
    let (base, state, _handle) = common::spawn(Backend::seeded()).await;
    let tutor = client_with_token(&base, TUTOR_TOKEN);

    let rejected = tutor
        .get_sessions(&SessionFilter::for_tutor("tutor-1").with_status(SessionStatus::Rejected))
        .await
        .unwrap();
    let before = state.lock().await.request_count();

    let err = tutor
        .update_session_status(&rejected[0], SessionStatus::Confirmed)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Booking(BookingError::InvalidTransition { .. })
    ));
    assert_eq!(state.lock().await.request_count(), before);
}

/// A stale local copy is corrected by the service's answer.
#[tokio::test]
async fn test_stale_local_copy_is_refused_by_service() {
    let (base, state, _handle) = common::spawn(Backend::seeded()).await;
    let student = client_with_token(&base, STUDENT_TOKEN);
    let tutor = client_with_token(&base, TUTOR_TOKEN);

    let pending = student.create_booking_session(&monday_request()).await.unwrap();

    // The tutor rejects it behind the student's back.
    tutor
        .update_session_status(&pending, SessionStatus::Rejected)
        .await
        .unwrap();

    let err = student
        .update_session_status(&pending, SessionStatus::Canceled)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 409, .. }));

    let refreshed = student
        .get_sessions(&SessionFilter::for_student("student-1"))
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.id == pending.id)
        .unwrap();

    let mut local = pending.clone();
    local.reconcile(refreshed).unwrap();
    assert_eq!(local.status, SessionStatus::Rejected);
    assert!(state.lock().await.sessions.iter().any(|s| s.id == pending.id));
}
