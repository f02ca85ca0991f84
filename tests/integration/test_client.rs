//! Integration tests for the HTTP client and its credential gate
//!
//! Each test starts the in-memory backend on an ephemeral port and drives
//! it through `HttpTutoringClient`.

mod common;

use chrono::{Duration, FixedOffset, Utc, Weekday};
use tutorhub_client::{ClientError, HttpTutoringClient, SessionFilter};
use tutorhub_core::{
    normalize_availability, Credential, CredentialStore, FileCredentialStore, GateOutcome,
    MemoryCredentialStore, Role, SessionContext, SessionStatus, UserIdentity,
};

use common::{Backend, STUDENT_TOKEN};

fn student() -> UserIdentity {
    UserIdentity {
        id: "student-1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.edu".to_string(),
        role: Role::Student,
    }
}

fn signed_in(token: &str, expiry: chrono::DateTime<Utc>) -> SessionContext {
    let store = MemoryCredentialStore::with(Credential::new(token, expiry), Some(student()));
    SessionContext::start(store).expect("memory store never fails")
}

/// Availability fetched over HTTP normalizes into the weekly grid.
#[tokio::test]
async fn test_fetch_and_normalize_availability() {
    let (base, _state, _handle) = common::spawn(Backend::seeded()).await;
    let client = HttpTutoringClient::new(&base, SessionContext::anonymous()).unwrap();

    let slots = client.get_availability("tutor-1").await.unwrap();
    assert_eq!(slots.len(), 4);

    let utc = FixedOffset::east_opt(0).unwrap();
    let normalized = normalize_availability(&slots, utc).unwrap();

    assert_eq!(normalized.weekly_grid.day(Weekday::Mon), ["09:00-10:00", "10:00-11:00"]);
    assert_eq!(normalized.weekly_grid.day(Weekday::Tue), ["14:00-14:30"]);
    assert!(normalized.weekly_grid.day(Weekday::Wed).is_empty());
    assert!(normalized.weekly_grid.day(Weekday::Fri).is_empty());
    assert_eq!(
        normalized.readable_ranges,
        ["Mon 9:00 AM-11:00 AM", "Tue 2:00 PM-2:30 PM"]
    );
}

/// A valid credential is sent as a bearer token.
#[tokio::test]
async fn test_valid_credential_is_attached() {
    let (base, state, _handle) = common::spawn(Backend::seeded()).await;
    let session = signed_in(STUDENT_TOKEN, Utc::now() + Duration::hours(1));
    let client = HttpTutoringClient::new(&base, session).unwrap();

    client.get_availability("tutor-1").await.unwrap();

    let backend = state.lock().await;
    assert_eq!(
        backend.auth_headers,
        [Some(format!("Bearer {STUDENT_TOKEN}"))]
    );
    drop(backend);
    assert_eq!(client.last_gate_outcome().await, Some(GateOutcome::Attached));
}

/// Without a credential the request still goes out, unauthenticated.
#[tokio::test]
async fn test_anonymous_request_proceeds() {
    let (base, state, _handle) = common::spawn(Backend::seeded()).await;
    let client = HttpTutoringClient::new(&base, SessionContext::anonymous()).unwrap();

    client.get_sessions(&SessionFilter::all()).await.unwrap();

    assert_eq!(state.lock().await.auth_headers, [None::<String>]);
    assert_eq!(client.last_gate_outcome().await, Some(GateOutcome::Anonymous));
}

/// A credential that expired one second ago is evicted, not sent.
#[tokio::test]
async fn test_expired_credential_is_evicted_from_disk() {
    let (base, state, _handle) = common::spawn(Backend::seeded()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    let mut store = FileCredentialStore::new(&path);
    store
        .save(
            &Credential::new(STUDENT_TOKEN, Utc::now() - Duration::seconds(1)),
            Some(&student()),
        )
        .unwrap();

    let session = SessionContext::start(FileCredentialStore::new(&path)).unwrap();
    let client = HttpTutoringClient::new(&base, session).unwrap();

    client.get_availability("tutor-1").await.unwrap();

    assert_eq!(state.lock().await.auth_headers, [None::<String>]);
    assert_eq!(client.last_gate_outcome().await, Some(GateOutcome::Evicted));
    assert!(client.identity().await.is_none());

    let reopened = FileCredentialStore::new(&path);
    assert!(reopened.load_credential().unwrap().is_none());
    assert!(reopened.load_identity().unwrap().is_none());

    // Later calls find nothing to evict.
    client.get_availability("tutor-1").await.unwrap();
    assert_eq!(client.last_gate_outcome().await, Some(GateOutcome::Anonymous));
}

/// Filter fields travel as query parameters.
#[tokio::test]
async fn test_session_filter() {
    let (base, _state, _handle) = common::spawn(Backend::seeded()).await;
    let client = HttpTutoringClient::new(&base, SessionContext::anonymous()).unwrap();

    let mine = client
        .get_sessions(&SessionFilter::for_student("student-1"))
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);

    let completed = client
        .get_sessions(&SessionFilter::for_tutor("tutor-1").with_status(SessionStatus::Completed))
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);
    assert!(completed.iter().all(|s| s.status == SessionStatus::Completed));
}

/// The service refusing the caller surfaces as an unauthorized status error.
#[tokio::test]
async fn test_status_update_without_credential_is_unauthorized() {
    let (base, _state, _handle) = common::spawn(Backend::seeded()).await;
    let client = HttpTutoringClient::new(&base, SessionContext::anonymous()).unwrap();
    let sessions = client
        .get_sessions(&SessionFilter::all().with_status(SessionStatus::Pending))
        .await
        .unwrap();

    let err = client
        .update_session_status(&sessions[0], SessionStatus::Confirmed)
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(matches!(err, ClientError::Status { status: 401, .. }));
}

/// An unreachable service reports a transient error.
#[tokio::test]
async fn test_unreachable_service_is_transient() {
    let (base, _state, handle) = common::spawn(Backend::seeded()).await;
    handle.abort();
    let _ = handle.await;

    let client = HttpTutoringClient::new(&base, SessionContext::anonymous()).unwrap();
    let err = client.get_availability("tutor-1").await.unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
    assert!(err.is_transient());
}
