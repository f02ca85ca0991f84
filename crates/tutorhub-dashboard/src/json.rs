//! JSON dashboard output.
//!
//! [`JsonGenerator`] serializes a [`Dashboard`] either compactly for
//! programs or pretty-printed for people.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use tutorhub_dashboard::{json::JsonGenerator, Dashboard};
//!
//! let dashboard = Dashboard::for_tutor("tutor-1", "Grace", &[], None, Utc::now());
//! let generator = JsonGenerator::new(&dashboard);
//!
//! let compact = generator.generate().unwrap();
//! assert!(!compact.contains('\n'));
//!
//! // generator.write_to_file(Path::new("dashboard.json"), true).unwrap();
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{Dashboard, DashboardError, Result};

/// JSON dashboard generator.
pub struct JsonGenerator<'a> {
    dashboard: &'a Dashboard,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a generator for `dashboard`.
    #[must_use]
    pub const fn new(dashboard: &'a Dashboard) -> Self {
        Self { dashboard }
    }

    /// Generates single-line JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Serialization`] if serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.dashboard).map_err(DashboardError::from)
    }

    /// Generates JSON indented with two spaces.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.dashboard).map_err(DashboardError::from)
    }

    /// Writes the dashboard to `path`, replacing any existing file.
    ///
    /// Parent directories must exist.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Serialization`] if serialization fails and
    /// [`DashboardError::Io`] if the file cannot be written.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
