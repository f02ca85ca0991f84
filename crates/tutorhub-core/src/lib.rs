//! TutorHub booking core
//!
//! Availability normalization, the booking-session state machine,
//! dashboard statistics and the credential gate shared by every TutorHub
//! client.

pub mod availability;
pub mod config;
pub mod error;
pub mod gate;
pub mod session;
pub mod stats;

pub use availability::{
    normalize_availability, weekday_name, AvailabilitySlot, NormalizedAvailability, SlotStatus,
    WeeklyGrid, WEEKDAYS,
};
pub use config::Config;
pub use error::{BookingError, Result};
pub use gate::{
    BearerAuth, Credential, CredentialStore, FileCredentialStore, GateOutcome,
    MemoryCredentialStore, SessionContext, UserIdentity,
};
pub use session::{
    classify, validate_transition, BookingRequest, BookingSession, Role, SessionBuckets,
    SessionStatus, SessionType,
};
pub use stats::{
    aggregate, compute_student_stats, compute_tutor_stats, CompletedTotals, Perspective,
    StudentStats, StudentView, TutorStats, TutorView,
};
