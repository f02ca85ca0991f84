//! HTTP client for the tutoring service.
//!
//! This module provides [`HttpTutoringClient`], which issues the service's
//! REST calls through `reqwest` and routes each of them through the
//! [`SessionContext`] credential gate.

use chrono::Utc;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use tutorhub_core::{
    AvailabilitySlot, BearerAuth, BookingRequest, BookingSession, Config, Credential,
    GateOutcome, SessionContext, SessionStatus, UserIdentity,
};

use crate::{ClientError, Result};

/// Query parameters for listing sessions. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilter {
    /// Only sessions taught by this tutor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<String>,
    /// Only sessions booked by this student.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    /// Only sessions in this status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
}

impl SessionFilter {
    /// Matches every session the caller may see.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches sessions taught by `tutor_id`.
    #[must_use]
    pub fn for_tutor(tutor_id: impl Into<String>) -> Self {
        Self {
            tutor_id: Some(tutor_id.into()),
            ..Self::default()
        }
    }

    /// Matches sessions booked by `student_id`.
    #[must_use]
    pub fn for_student(student_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id.into()),
            ..Self::default()
        }
    }

    /// Restricts the filter to one status.
    #[must_use]
    pub const fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Serialize)]
struct StatusUpdate {
    status: SessionStatus,
}

/// A request builder that the gate can authorize.
struct Outbound(RequestBuilder);

impl BearerAuth for Outbound {
    fn with_bearer(self, token: &str) -> Self {
        Self(self.0.bearer_auth(token))
    }
}

struct GateState {
    context: SessionContext,
    last_outcome: Option<GateOutcome>,
}

/// Client for the tutoring service REST API.
///
/// # Example
///
/// ```no_run
/// use tutorhub_client::{HttpTutoringClient, SessionFilter};
/// use tutorhub_core::SessionContext;
///
/// # async fn example() -> Result<(), tutorhub_client::ClientError> {
/// let client = HttpTutoringClient::new("https://tutoring.example.edu/api", SessionContext::anonymous())?;
/// let slots = client.get_availability("tutor-1").await?;
/// let sessions = client.get_sessions(&SessionFilter::for_tutor("tutor-1")).await?;
/// println!("{} slots, {} sessions", slots.len(), sessions.len());
/// # Ok(())
/// # }
/// ```
pub struct HttpTutoringClient {
    http: reqwest::Client,
    base_url: Url,
    gate: Mutex<GateState>,
}

impl std::fmt::Debug for HttpTutoringClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTutoringClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTutoringClient {
    /// Creates a client for `base_url` with default HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute `http` or `https` URL.
    pub fn new(base_url: &str, session: SessionContext) -> Result<Self> {
        Self::with_http_client(reqwest::Client::new(), base_url, session)
    }

    /// Creates a client from configuration, applying its request timeout.
    pub fn from_config(config: &Config, session: SessionContext) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Self::with_http_client(http, &config.api_base_url, session)
    }

    /// Creates a client around an existing `reqwest::Client`.
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        session: SessionContext,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        debug!(base_url = %base_url, "Created tutoring service client");
        Ok(Self {
            http,
            base_url,
            gate: Mutex::new(GateState {
                context: session,
                last_outcome: None,
            }),
        })
    }

    /// The service base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Releases the session context, e.g. to log out.
    #[must_use]
    pub fn into_session(self) -> SessionContext {
        self.gate.into_inner().context
    }

    /// The identity cached alongside the credential.
    pub async fn identity(&self) -> Option<UserIdentity> {
        self.gate.lock().await.context.identity().cloned()
    }

    /// What the gate did for the most recent outbound request.
    pub async fn last_gate_outcome(&self) -> Option<GateOutcome> {
        self.gate.lock().await.last_outcome
    }

    /// Stores a new credential and identity in the session.
    pub async fn login(
        &self,
        credential: Credential,
        identity: Option<UserIdentity>,
    ) -> Result<()> {
        self.gate.lock().await.context.login(credential, identity)?;
        info!("Stored new credential");
        Ok(())
    }

    /// Fetches a tutor's availability slots.
    #[instrument(skip(self))]
    pub async fn get_availability(&self, tutor_id: &str) -> Result<Vec<AvailabilitySlot>> {
        let url = self.endpoint(&["availability", tutor_id])?;
        let slots: Vec<AvailabilitySlot> = self.execute(self.http.get(url)).await?;
        debug!(count = slots.len(), "Fetched availability");
        Ok(slots)
    }

    /// Lists sessions matching `filter`.
    #[instrument(skip(self))]
    pub async fn get_sessions(&self, filter: &SessionFilter) -> Result<Vec<BookingSession>> {
        let url = self.endpoint(&["sessions"])?;
        let sessions: Vec<BookingSession> = self.execute(self.http.get(url).query(filter)).await?;
        debug!(count = sessions.len(), "Fetched sessions");
        Ok(sessions)
    }

    /// Submits a booking request and returns the session the service created.
    ///
    /// The request is validated before dispatch.
    #[instrument(skip(self, request), fields(slot_id = %request.slot_id))]
    pub async fn create_booking_session(&self, request: &BookingRequest) -> Result<BookingSession> {
        request.validate()?;
        let url = self.endpoint(&["sessions"])?;
        let session: BookingSession = self.execute(self.http.post(url).json(request)).await?;
        info!(session_id = %session.id, status = %session.status, "Booking session created");
        Ok(session)
    }

    /// Asks the service to move `session` to `to`.
    ///
    /// The transition is checked against the state graph before dispatch.
    /// `session` is left untouched; the service's copy is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Booking`] if the transition is not allowed or the
    /// service reports a status that cannot follow the current one.
    #[instrument(skip(self, session), fields(session_id = %session.id, from = %session.status))]
    pub async fn update_session_status(
        &self,
        session: &BookingSession,
        to: SessionStatus,
    ) -> Result<BookingSession> {
        session.status.validate_transition(to)?;

        let url = self.endpoint(&["sessions", &session.id, "status"])?;
        let body = StatusUpdate { status: to };
        let updated: BookingSession = self.execute(self.http.patch(url).json(&body)).await?;

        session.status.validate_observed(updated.status)?;
        info!(status = %updated.status, "Session status updated");
        Ok(updated)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| invalid_base_url(self.base_url.as_str(), "cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let request = {
            let mut gate = self.gate.lock().await;
            let (request, outcome) = gate
                .context
                .attach_credential_if_valid(Outbound(builder), Utc::now());
            gate.last_outcome = Some(outcome);
            request.0.build()?
        };

        let method: Method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, %path, "Sending request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%method, %path, status = status.as_u16(), "Service returned an error");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url.trim()).map_err(|e| invalid_base_url(base_url, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid_base_url(base_url, "scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(invalid_base_url(base_url, "cannot be a base"));
    }
    Ok(url)
}

fn invalid_base_url(url: &str, message: impl Into<String>) -> ClientError {
    ClientError::InvalidBaseUrl {
        url: url.to_string(),
        message: message.into(),
    }
}
