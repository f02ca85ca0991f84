//! TutorHub service client
//!
//! Talks to the tutoring service REST API. Every outbound request passes
//! through the session's credential gate, and booking rules are checked
//! locally before anything is dispatched.

use thiserror::Error;
use tutorhub_core::BookingError;

pub mod client;

pub use client::{HttpTutoringClient, SessionFilter};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the tutoring service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A booking rule rejected the operation before dispatch.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// The configured base URL cannot address the service.
    #[error("invalid base URL '{url}': {message}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },
}

impl ClientError {
    /// Returns `true` if retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Booking(_) | Self::InvalidBaseUrl { .. } => false,
        }
    }

    /// Returns `true` if the service refused the caller's credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }

    /// Returns `true` if the error was caused by the caller's input.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Booking(e) => e.is_user_error(),
            Self::Status { status, .. } => (400..500).contains(status),
            Self::Http(_) | Self::InvalidBaseUrl { .. } => false,
        }
    }
}
