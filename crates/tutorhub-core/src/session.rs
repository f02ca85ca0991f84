//! Booking session types and the session state machine.
//!
//! The authoritative state machine lives in the tutoring service. This module
//! mirrors it as a read-only transition table so the client can validate
//! requested transitions before sending them and classify what it observes.
//!
//! The status transitions are:
//! - `Pending` -> `Confirmed` -> `Completed`
//! - `Pending` -> `Rejected`
//! - `Pending` | `Confirmed` -> `Canceled`

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilitySlot;
use crate::error::{BookingError, Result};

// ============================================================================
// SessionStatus
// ============================================================================

/// Lifecycle status of a booking session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Requested by the student, awaiting the tutor.
    #[default]
    Pending,
    /// Accepted by the tutor.
    Confirmed,
    /// Declined by the tutor.
    Rejected,
    /// Took place.
    Completed,
    /// Withdrawn by either party before completion.
    Canceled,
}

impl SessionStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Rejected,
        Self::Completed,
        Self::Canceled,
    ];

    /// Returns the statuses reachable from `self` in one step.
    ///
    /// # Examples
    ///
    /// ```
    /// use tutorhub_core::SessionStatus;
    ///
    /// assert_eq!(
    ///     SessionStatus::Confirmed.allowed_next(),
    ///     &[SessionStatus::Completed, SessionStatus::Canceled]
    /// );
    /// assert!(SessionStatus::Rejected.allowed_next().is_empty());
    /// ```
    #[must_use]
    pub const fn allowed_next(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Rejected, Self::Canceled],
            Self::Confirmed => &[Self::Completed, Self::Canceled],
            Self::Rejected | Self::Completed | Self::Canceled => &[],
        }
    }

    /// Returns `true` if no further transition is valid.
    ///
    /// Terminal statuses are: `Rejected`, `Completed`, `Canceled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Returns `true` if `self -> to` is an edge of the state graph.
    ///
    /// Self-loops are never edges.
    #[must_use]
    pub fn can_transition(&self, to: Self) -> bool {
        self.allowed_next().contains(&to)
    }

    /// Checks a requested transition before it is sent to the service.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidTransition` if the edge does not exist.
    pub fn validate_transition(&self, to: Self) -> Result<()> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(BookingError::invalid_transition(self, to))
        }
    }

    /// Checks a status reported by the service against the last known one.
    ///
    /// An unchanged status is accepted. Otherwise the observed status must
    /// be reachable from `self` by one or more edges, so a terminal session
    /// can never be reported in another status.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidTransition` if `observed` cannot follow `self`.
    pub fn validate_observed(&self, observed: Self) -> Result<()> {
        if *self == observed || self.can_reach(observed) {
            Ok(())
        } else {
            Err(BookingError::invalid_transition(self, observed))
        }
    }

    /// Returns `true` if `to` is reachable from `self` by one or more edges.
    fn can_reach(&self, to: Self) -> bool {
        self.allowed_next()
            .iter()
            .any(|next| *next == to || next.can_reach(to))
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                BookingError::invalid_request(
                    format!("unknown session status '{s}'"),
                    "Use one of PENDING, CONFIRMED, REJECTED, COMPLETED, CANCELED",
                )
            })
    }
}

/// Returns `true` if `from -> to` is a valid session transition.
#[must_use]
pub fn validate_transition(from: SessionStatus, to: SessionStatus) -> bool {
    from.can_transition(to)
}

// ============================================================================
// SessionType
// ============================================================================

/// How the session takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    /// Video call; `location_or_link` is a meeting link.
    Online,
    /// Face to face; `location_or_link` is a room or address.
    InPerson,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "ONLINE"),
            Self::InPerson => write!(f, "IN_PERSON"),
        }
    }
}

impl std::str::FromStr for SessionType {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "online" => Ok(Self::Online),
            "in_person" => Ok(Self::InPerson),
            _ => Err(BookingError::invalid_request(
                format!("unknown session type '{s}'"),
                "Use ONLINE or IN_PERSON",
            )),
        }
    }
}

// ============================================================================
// BookingRequest
// ============================================================================

/// What a student submits to book a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Slot being booked.
    pub slot_id: String,
    /// Topic of the session.
    pub subject: String,
    /// Online or in person.
    #[serde(rename = "type")]
    pub session_type: SessionType,
    /// Meeting link or physical location.
    pub location_or_link: String,
    /// Optional notes for the tutor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_notes: Option<String>,
}

impl BookingRequest {
    /// Builds a request and checks that every required field is present.
    ///
    /// Blank notes are dropped.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidRequest` if `slot_id`, `subject` or
    /// `location_or_link` is empty.
    pub fn new(
        slot_id: impl Into<String>,
        subject: impl Into<String>,
        session_type: SessionType,
        location_or_link: impl Into<String>,
        student_notes: Option<String>,
    ) -> Result<Self> {
        let request = Self {
            slot_id: slot_id.into(),
            subject: subject.into(),
            session_type,
            location_or_link: location_or_link.into(),
            student_notes: student_notes.filter(|notes| !notes.trim().is_empty()),
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks field presence. Runs before any dispatch.
    pub fn validate(&self) -> Result<()> {
        if self.slot_id.trim().is_empty() {
            return Err(BookingError::invalid_request(
                "slotId is required",
                "Pick one of the tutor's available slots",
            ));
        }

        if self.subject.trim().is_empty() {
            return Err(BookingError::invalid_request(
                "subject is required",
                "Describe what you want to work on",
            ));
        }

        if self.location_or_link.trim().is_empty() {
            let suggestion = match self.session_type {
                SessionType::Online => "Provide the meeting link",
                SessionType::InPerson => "Provide the meeting location",
            };
            return Err(BookingError::invalid_request(
                "locationOrLink is required",
                suggestion,
            ));
        }

        Ok(())
    }

    /// Finds the slot this request refers to among `slots`.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidRequest` if the slot is unknown or not
    /// `AVAILABLE`.
    pub fn resolve_slot<'a>(&self, slots: &'a [AvailabilitySlot]) -> Result<&'a AvailabilitySlot> {
        let slot = slots
            .iter()
            .find(|slot| slot.id == self.slot_id)
            .ok_or_else(|| {
                BookingError::invalid_request(
                    format!("slot '{}' does not exist", self.slot_id),
                    "Refresh the tutor's availability and pick another slot",
                )
            })?;

        if !slot.is_available() {
            return Err(BookingError::invalid_request(
                format!("slot '{}' is {}", slot.id, slot.status),
                "Pick a slot that is still available",
            ));
        }

        Ok(slot)
    }
}

// ============================================================================
// BookingSession
// ============================================================================

/// A single tutoring session between one student and one tutor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSession {
    /// Session identifier.
    pub id: String,
    /// Tutor taking the session.
    pub tutor_id: String,
    /// Student who booked the session.
    pub student_id: String,
    /// Slot the session was booked against.
    pub slot_id: String,
    /// Topic of the session.
    pub subject: String,
    /// Online or in person.
    #[serde(rename = "type")]
    pub session_type: SessionType,
    /// Meeting link or physical location.
    pub location_or_link: String,
    /// Optional notes from the student.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_notes: Option<String>,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
    /// Student rating, usually 1 to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Actual length in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl BookingSession {
    /// Creates a local `Pending` session for a validated request.
    ///
    /// The session gets a provisional id until the service acknowledges it.
    /// Times are taken from the resolved slot.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidRequest` if the request is malformed or
    /// its slot is not among `slots` as `AVAILABLE`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use tutorhub_core::{
    ///     AvailabilitySlot, BookingRequest, BookingSession, SessionStatus, SessionType, SlotStatus,
    /// };
    ///
    /// let slots = [AvailabilitySlot {
    ///     id: "slot-1".to_string(),
    ///     tutor_id: "tutor-1".to_string(),
    ///     start_time: Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
    ///     end_time: Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
    ///     status: SlotStatus::Available,
    /// }];
    /// let request = BookingRequest::new(
    ///     "slot-1", "Linear algebra", SessionType::Online, "https://meet.example/abc", None,
    /// )
    /// .unwrap();
    ///
    /// let session = BookingSession::create(&request, &slots, "student-1").unwrap();
    /// assert_eq!(session.status, SessionStatus::Pending);
    /// assert_eq!(session.tutor_id, "tutor-1");
    /// ```
    pub fn create(
        request: &BookingRequest,
        slots: &[AvailabilitySlot],
        student_id: impl Into<String>,
    ) -> Result<Self> {
        request.validate()?;
        let slot = request.resolve_slot(slots)?;

        Ok(Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            tutor_id: slot.tutor_id.clone(),
            student_id: student_id.into(),
            slot_id: slot.id.clone(),
            subject: request.subject.clone(),
            session_type: request.session_type,
            location_or_link: request.location_or_link.clone(),
            student_notes: request.student_notes.clone(),
            status: SessionStatus::Pending,
            start_time: slot.start_time,
            end_time: slot.end_time,
            rating: None,
            duration: None,
        })
    }

    /// Returns `true` if the session still carries a provisional id.
    #[must_use]
    pub fn is_provisional(&self) -> bool {
        self.id.starts_with("local-")
    }

    /// Returns `true` if the session reached a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns `true` if `user_id` takes part in the session in `role`.
    #[must_use]
    pub fn involves(&self, role: Role, user_id: &str) -> bool {
        match role {
            Role::Tutor => self.tutor_id == user_id,
            Role::Student => self.student_id == user_id,
        }
    }

    /// Replaces the local view with the one confirmed by the service.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidRequest` if the confirmed copy is for a
    /// different slot or tutor, and `BookingError::InvalidTransition` if the
    /// confirmed status cannot follow the local one. On error the local view
    /// is left unchanged.
    pub fn reconcile(&mut self, confirmed: Self) -> Result<()> {
        if confirmed.slot_id != self.slot_id || confirmed.tutor_id != self.tutor_id {
            return Err(BookingError::invalid_request(
                format!(
                    "service returned slot '{}' of tutor '{}' for local slot '{}' of tutor '{}'",
                    confirmed.slot_id, confirmed.tutor_id, self.slot_id, self.tutor_id
                ),
                "Refresh the session list and retry",
            ));
        }
        self.status.validate_observed(confirmed.status)?;
        *self = confirmed;
        Ok(())
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Which side of a session a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Teaches the session.
    Tutor,
    /// Books the session.
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tutor => write!(f, "tutor"),
            Self::Student => write!(f, "student"),
        }
    }
}

/// Sessions partitioned by status for dashboard presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBuckets {
    /// Awaiting the tutor's answer.
    pub pending: Vec<BookingSession>,
    /// Confirmed and starting in the future.
    pub upcoming: Vec<BookingSession>,
    /// Confirmed but already started and not yet marked completed.
    pub awaiting_completion: Vec<BookingSession>,
    /// Completed, regardless of time.
    pub completed: Vec<BookingSession>,
    /// Rejected or canceled.
    pub closed: Vec<BookingSession>,
}

impl SessionBuckets {
    /// Total number of classified sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
            + self.upcoming.len()
            + self.awaiting_completion.len()
            + self.completed.len()
            + self.closed.len()
    }

    /// Returns `true` if no session was classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions the sessions `user_id` takes part in as `role`.
///
/// Upcoming sessions are sorted by start time; every other bucket keeps the
/// input order.
#[must_use]
pub fn classify(
    sessions: &[BookingSession],
    role: Role,
    user_id: &str,
    now: DateTime<Utc>,
) -> SessionBuckets {
    let mut buckets = SessionBuckets::default();

    for session in sessions.iter().filter(|s| s.involves(role, user_id)) {
        let bucket = match session.status {
            SessionStatus::Pending => &mut buckets.pending,
            SessionStatus::Confirmed if session.start_time > now => &mut buckets.upcoming,
            SessionStatus::Confirmed => &mut buckets.awaiting_completion,
            SessionStatus::Completed => &mut buckets.completed,
            SessionStatus::Rejected | SessionStatus::Canceled => &mut buckets.closed,
        };
        bucket.push(session.clone());
    }

    buckets.upcoming.sort_by_key(|s| s.start_time);
    buckets
}

// ============================================================================
// Tests
// ============================================================================
