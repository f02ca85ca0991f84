//! In-memory stand-in for the tutoring service.
//!
//! Serves the availability and session endpoints under `/api`, records the
//! `Authorization` header of every request and enforces the session state
//! graph on status updates.

#![allow(dead_code, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tutorhub_client::SessionFilter;
use tutorhub_core::{
    AvailabilitySlot, BookingRequest, BookingSession, SessionStatus, SessionType, SlotStatus,
};

/// Token the backend accepts for `student-1`.
pub const STUDENT_TOKEN: &str = "student-1-token";

/// Token the backend accepts for `tutor-1`.
pub const TUTOR_TOKEN: &str = "tutor-1-token";

/// Backend state shared with the test.
#[derive(Debug, Default)]
pub struct Backend {
    pub slots: Vec<AvailabilitySlot>,
    pub sessions: Vec<BookingSession>,
    /// `Authorization` header of each request, in arrival order.
    pub auth_headers: Vec<Option<String>>,
    tokens: HashMap<String, String>,
    next_id: u32,
}

pub type Shared = Arc<Mutex<Backend>>;

impl Backend {
    /// Backend seeded with `tutor-1`'s week and a few sessions.
    pub fn seeded() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(STUDENT_TOKEN.to_string(), "student-1".to_string());
        tokens.insert(TUTOR_TOKEN.to_string(), "tutor-1".to_string());

        Self {
            slots: vec![
                slot("slot-mon", at(2026, 1, 5, 9, 0), at(2026, 1, 5, 11, 0), SlotStatus::Available),
                slot("slot-tue", at(2026, 1, 6, 14, 0), at(2026, 1, 6, 14, 30), SlotStatus::Available),
                slot("slot-wed", at(2026, 1, 7, 9, 0), at(2026, 1, 7, 10, 0), SlotStatus::Booked),
                slot("slot-fri", at(2026, 1, 9, 16, 0), at(2026, 1, 9, 17, 0), SlotStatus::Blocked),
            ],
            sessions: vec![
                session("session-a", "student-1", SessionStatus::Completed, at(2025, 12, 1, 9, 0), Some(4.0), Some(60)),
                session("session-b", "student-2", SessionStatus::Completed, at(2025, 12, 2, 9, 0), Some(5.0), Some(90)),
                session("session-c", "student-1", SessionStatus::Pending, at(2026, 1, 8, 9, 0), None, None),
                session("session-d", "student-3", SessionStatus::Rejected, at(2026, 1, 8, 11, 0), None, None),
            ],
            auth_headers: Vec::new(),
            tokens,
            next_id: 1,
        }
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.auth_headers.len()
    }

    fn caller(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.tokens.get(token).cloned()
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub fn slot(id: &str, start: DateTime<Utc>, end: DateTime<Utc>, status: SlotStatus) -> AvailabilitySlot {
    AvailabilitySlot {
        id: id.to_string(),
        tutor_id: "tutor-1".to_string(),
        start_time: start,
        end_time: end,
        status,
    }
}

pub fn session(
    id: &str,
    student: &str,
    status: SessionStatus,
    start: DateTime<Utc>,
    rating: Option<f64>,
    duration: Option<u32>,
) -> BookingSession {
    BookingSession {
        id: id.to_string(),
        tutor_id: "tutor-1".to_string(),
        student_id: student.to_string(),
        slot_id: format!("slot-for-{id}"),
        subject: "Statistics".to_string(),
        session_type: SessionType::Online,
        location_or_link: "https://meet.example/stats".to_string(),
        student_notes: None,
        status,
        start_time: start,
        end_time: start + Duration::hours(1),
        rating,
        duration,
    }
}

/// Starts the backend on an ephemeral port and returns its `/api` base URL.
pub async fn spawn(backend: Backend) -> (String, Shared, JoinHandle<()>) {
    let state: Shared = Arc::new(Mutex::new(backend));
    let router = router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    (format!("http://{addr}/api"), state, handle)
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/availability/:tutor_id", get(get_availability))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/:id/status", patch(update_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn record(backend: &mut Backend, headers: &HeaderMap) {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    backend.auth_headers.push(value);
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, message.to_string()).into_response()
}

async fn get_availability(
    State(state): State<Shared>,
    Path(tutor_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut backend = state.lock().await;
    record(&mut backend, &headers);

    let slots: Vec<AvailabilitySlot> = backend
        .slots
        .iter()
        .filter(|s| s.tutor_id == tutor_id)
        .cloned()
        .collect();
    Json(slots).into_response()
}

async fn list_sessions(
    State(state): State<Shared>,
    Query(filter): Query<SessionFilter>,
    headers: HeaderMap,
) -> Response {
    let mut backend = state.lock().await;
    record(&mut backend, &headers);

    let sessions: Vec<BookingSession> = backend
        .sessions
        .iter()
        .filter(|s| filter.tutor_id.as_ref().map_or(true, |t| *t == s.tutor_id))
        .filter(|s| filter.student_id.as_ref().map_or(true, |t| *t == s.student_id))
        .filter(|s| filter.status.map_or(true, |status| status == s.status))
        .cloned()
        .collect();
    Json(sessions).into_response()
}

async fn create_session(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Response {
    let mut backend = state.lock().await;
    record(&mut backend, &headers);

    let Some(student_id) = backend.caller(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "missing or unknown token");
    };
    let Some(slot) = backend
        .slots
        .iter_mut()
        .find(|s| s.id == request.slot_id && s.status == SlotStatus::Available)
    else {
        return error(StatusCode::CONFLICT, "slot is not available");
    };
    slot.status = SlotStatus::Booked;
    let (tutor_id, start_time, end_time) = (slot.tutor_id.clone(), slot.start_time, slot.end_time);

    let id = format!("session-{}", backend.next_id);
    backend.next_id += 1;

    let created = BookingSession {
        id,
        tutor_id,
        student_id,
        slot_id: request.slot_id,
        subject: request.subject,
        session_type: request.session_type,
        location_or_link: request.location_or_link,
        student_notes: request.student_notes,
        status: SessionStatus::Pending,
        start_time,
        end_time,
        rating: None,
        duration: None,
    };
    backend.sessions.push(created.clone());
    (StatusCode::CREATED, Json(created)).into_response()
}

#[derive(Deserialize)]
struct StatusBody {
    status: SessionStatus,
}

async fn update_status(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<StatusBody>,
) -> Response {
    let mut backend = state.lock().await;
    record(&mut backend, &headers);

    if backend.caller(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "missing or unknown token");
    }
    let Some(session) = backend.sessions.iter_mut().find(|s| s.id == id) else {
        return error(StatusCode::NOT_FOUND, "no such session");
    };
    if !session.status.can_transition(body.status) {
        return error(StatusCode::CONFLICT, "transition not allowed");
    }
    session.status = body.status;
    Json(session.clone()).into_response()
}
