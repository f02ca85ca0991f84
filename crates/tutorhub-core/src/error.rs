//! Error types for the TutorHub booking core.
//!
//! This module defines the error hierarchy for the core: malformed booking
//! input, state graph violations, degenerate availability windows, plus the
//! ambient configuration and credential storage failures.

use std::path::PathBuf;

/// A specialized `Result` type for booking core operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Errors that can occur inside the booking core.
///
/// The first three variants form the domain taxonomy. They are local,
/// synchronous and recoverable: the caller surfaces a message and does not
/// retry automatically.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    // ========================================================================
    // Domain Errors
    // ========================================================================
    /// Malformed booking input: an empty required field or a slot reference
    /// that does not resolve to an available slot.
    #[error("Invalid booking request: {message}\n\nSuggestion: {suggestion}")]
    InvalidRequest {
        /// Description of what is wrong with the request.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// A status change not permitted by the session state graph.
    #[error("Invalid session transition: cannot go from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: String,
        /// The requested or observed status.
        to: String,
    },

    /// Zero-length or inverted availability window.
    #[error("Invalid availability slot '{slot_id}': end time {end} is not after start time {start}")]
    InvalidSlot {
        /// Identifier of the offending slot.
        slot_id: String,
        /// Slot start, RFC 3339.
        start: String,
        /// Slot end, RFC 3339.
        end: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your tutorhub.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Credential Storage Errors
    // ========================================================================
    /// The local credential store could not be read or written.
    #[error("Credential store error at '{path}': {message}\n\nSuggestion: Remove the file and log in again")]
    CredentialStore {
        /// Path to the backing file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The operation needs a held credential and there is none.
    #[error("Not signed in\n\nSuggestion: Run `tutorhub login` first")]
    NotSignedIn,

    /// A token could not be decoded into a credential.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BookingError {
    /// Creates a new `InvalidRequest` error with the given message and suggestion.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates a new `InvalidSlot` error.
    #[must_use]
    pub fn invalid_slot(
        slot_id: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self::InvalidSlot {
            slot_id: slot_id.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `CredentialStore` error.
    #[must_use]
    pub fn credential_store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CredentialStore {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error belongs to the booking domain taxonomy.
    ///
    /// These are caused by user input and should be shown to the user
    /// rather than logged as failures.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. } | Self::InvalidTransition { .. } | Self::InvalidSlot { .. }
        )
    }
}
