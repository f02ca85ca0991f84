//! Configuration types for TutorHub clients.
//!
//! The configuration names the external tutoring service, the fixed UTC
//! offset used to present availability, where the credential lives on disk
//! and how long outbound calls may take.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "tutorhub.json";

/// Largest accepted distance from UTC, in minutes (UTC-14:00 / UTC+14:00).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

fn offset_in_range(minutes: i32) -> bool {
    (-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&minutes)
}

/// Default base URL of the tutoring service.
fn default_api_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

/// Default credential file path.
fn default_credential_file() -> String {
    ".tutorhub/credentials.json".to_string()
}

/// Default timeout in seconds for a single outbound request.
const fn default_request_timeout_secs() -> u64 {
    30
}

/// Main configuration for TutorHub clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the tutoring service REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Offset from UTC, in minutes, used for weekday bucketing and labels.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Path of the file holding the credential and cached identity.
    #[serde(default = "default_credential_file")]
    pub credential_file: String,

    /// Timeout for a single outbound request in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            utc_offset_minutes: 0,
            credential_file: default_credential_file(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `tutorhub.json` in the current directory. If not found,
    /// returns default configuration.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            BookingError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::ConfigParseError` if the file exists but contains
    /// invalid JSON, and `BookingError::ConfigValidationError` if a value is
    /// out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(BookingError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| BookingError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// - `apiBaseUrl` must be a non-empty `http://` or `https://` URL
    /// - `utcOffsetMinutes` must lie within ±14 hours
    /// - `credentialFile` must not be empty
    /// - `requestTimeoutSecs` must be greater than 0
    pub fn validate(&self) -> Result<()> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(BookingError::config_validation(
                "apiBaseUrl must not be empty",
                "Set apiBaseUrl to the tutoring service URL in your tutorhub.json",
            ));
        }

        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(BookingError::config_validation(
                format!("apiBaseUrl '{base}' must start with http:// or https://"),
                "Use a full URL such as https://tutoring.example.edu/api",
            ));
        }

        if !offset_in_range(self.utc_offset_minutes) {
            return Err(BookingError::config_validation(
                format!(
                    "utcOffsetMinutes {} is outside the range -840..=840",
                    self.utc_offset_minutes
                ),
                "Set utcOffsetMinutes to your local offset, e.g. -300 for UTC-05:00",
            ));
        }

        if self.credential_file.trim().is_empty() {
            return Err(BookingError::config_validation(
                "credentialFile must not be empty",
                "Provide a credential file path in your tutorhub.json",
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(BookingError::config_validation(
                "requestTimeoutSecs must be greater than 0",
                "Set requestTimeoutSecs to at least 1 second in your tutorhub.json",
            ));
        }

        Ok(())
    }

    /// Returns the display offset used by the availability normalizer.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::ConfigValidationError` if the offset is out of range.
    pub fn display_offset(&self) -> Result<FixedOffset> {
        Some(self.utc_offset_minutes)
            .filter(|minutes| offset_in_range(*minutes))
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                BookingError::config_validation(
                    format!("utcOffsetMinutes {} is not a valid offset", self.utc_offset_minutes),
                    "Set utcOffsetMinutes within -840..=840",
                )
            })
    }

    /// Returns the credential file path.
    #[must_use]
    pub fn credential_path(&self) -> PathBuf {
        PathBuf::from(&self.credential_file)
    }

    /// Returns the request timeout as a [`std::time::Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
