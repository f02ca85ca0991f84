//! Session/token gate.
//!
//! A [`SessionContext`] owns the credential and cached identity for one
//! login session. Before every outbound call the context checks the
//! credential's expiry: valid credentials are attached as a bearer token,
//! stale ones are evicted together with the identity and the call proceeds
//! unauthenticated.
//!
//! The check is an in-memory comparison. Eviction also clears the backing
//! [`CredentialStore`], which is local storage, never the network.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BookingError, Result};
use crate::session::Role;

/// Storage key of the credential.
pub const CREDENTIAL_KEY: &str = "tutorhub.credential";

/// Storage key of the cached user identity.
pub const IDENTITY_KEY: &str = "tutorhub.user";

// ============================================================================
// Credential and identity
// ============================================================================

/// A bearer token and the instant it stops being valid.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Opaque bearer token.
    pub token: String,
    /// First instant at which the token is no longer valid.
    pub expiry: DateTime<Utc>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

// NumericDate may carry a fraction of a second.
#[derive(Deserialize)]
struct JwtClaims {
    exp: f64,
}

impl Credential {
    /// Creates a credential with an explicit expiry.
    #[must_use]
    pub fn new(token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expiry,
        }
    }

    /// Builds a credential from a JWT, reading the expiry from its `exp` claim.
    ///
    /// The signature is not checked; the service does that.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::MalformedToken` if the token has no payload
    /// segment, the payload is not base64url JSON, or `exp` is missing or out
    /// of range.
    pub fn from_jwt(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| BookingError::MalformedToken("missing payload segment".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| BookingError::MalformedToken(format!("payload is not base64url: {e}")))?;
        let claims: JwtClaims = serde_json::from_slice(&bytes).map_err(|e| {
            BookingError::MalformedToken(format!("payload has no usable exp claim: {e}"))
        })?;
        let out_of_range =
            || BookingError::MalformedToken(format!("exp {} is out of range", claims.exp));
        if !claims.exp.is_finite() {
            return Err(out_of_range());
        }
        #[allow(clippy::cast_possible_truncation)]
        let seconds = claims.exp.floor() as i64;
        let expiry = DateTime::from_timestamp(seconds, 0).ok_or_else(out_of_range)?;

        Ok(Self { token, expiry })
    }

    /// Returns `true` if the credential may be attached at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }
}

/// The signed-in user as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// User identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Whether the user tutors or books sessions.
    pub role: Role,
}

// ============================================================================
// CredentialStore
// ============================================================================

/// Local persistent storage for the credential and cached identity.
pub trait CredentialStore: Send {
    /// Reads the stored credential, if any.
    fn load_credential(&self) -> Result<Option<Credential>>;

    /// Reads the cached identity, if any.
    fn load_identity(&self) -> Result<Option<UserIdentity>>;

    /// Stores a credential and, optionally, the identity it belongs to.
    fn save(&mut self, credential: &Credential, identity: Option<&UserIdentity>) -> Result<()>;

    /// Removes both the credential and the cached identity.
    fn clear(&mut self) -> Result<()>;
}

/// Store that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    credential: Option<Credential>,
    identity: Option<UserIdentity>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            credential: None,
            identity: None,
        }
    }

    /// Creates a store pre-populated with a credential and identity.
    #[must_use]
    pub const fn with(credential: Credential, identity: Option<UserIdentity>) -> Self {
        Self {
            credential: Some(credential),
            identity,
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_credential(&self) -> Result<Option<Credential>> {
        Ok(self.credential.clone())
    }

    fn load_identity(&self) -> Result<Option<UserIdentity>> {
        Ok(self.identity.clone())
    }

    fn save(&mut self, credential: &Credential, identity: Option<&UserIdentity>) -> Result<()> {
        self.credential = Some(credential.clone());
        self.identity = identity.cloned();
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.credential = None;
        self.identity = None;
        Ok(())
    }
}

/// Store backed by a JSON key-value file.
///
/// The file holds an object keyed by [`CREDENTIAL_KEY`] and [`IDENTITY_KEY`].
/// Unknown keys are preserved.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store backed by `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(BookingError::credential_store(
                    &self.path,
                    format!("failed to read file: {e}"),
                ))
            }
        };

        serde_json::from_str(&contents)
            .map_err(|e| BookingError::credential_store(&self.path, e.to_string()))
    }

    fn write_entries(&self, entries: &BTreeMap<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                let message = format!("failed to create directory: {e}");
                BookingError::credential_store(&self.path, message)
            })?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json).map_err(|e| {
            BookingError::credential_store(&self.path, format!("failed to write file: {e}"))
        })
    }

    fn read_key<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut entries = self.read_entries()?;
        entries
            .remove(key)
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    let message = format!("invalid '{key}' entry: {e}");
                    BookingError::credential_store(&self.path, message)
                })
            })
            .transpose()
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_credential(&self) -> Result<Option<Credential>> {
        self.read_key(CREDENTIAL_KEY)
    }

    fn load_identity(&self) -> Result<Option<UserIdentity>> {
        self.read_key(IDENTITY_KEY)
    }

    fn save(&mut self, credential: &Credential, identity: Option<&UserIdentity>) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(CREDENTIAL_KEY.to_string(), serde_json::to_value(credential)?);
        match identity {
            Some(identity) => {
                entries.insert(IDENTITY_KEY.to_string(), serde_json::to_value(identity)?);
            }
            None => {
                entries.remove(IDENTITY_KEY);
            }
        }
        self.write_entries(&entries)
    }

    fn clear(&mut self) -> Result<()> {
        let mut entries = self.read_entries()?;
        let had_credential = entries.remove(CREDENTIAL_KEY).is_some();
        let had_identity = entries.remove(IDENTITY_KEY).is_some();
        if had_credential || had_identity {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

// ============================================================================
// Gate
// ============================================================================

/// A request that can carry a bearer token.
pub trait BearerAuth: Sized {
    /// Returns the request with `Authorization: Bearer <token>` set.
    #[must_use]
    fn with_bearer(self, token: &str) -> Self;
}

/// What the gate did for one outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// A valid credential was attached.
    Attached,
    /// No credential was held; the call goes out unauthenticated.
    Anonymous,
    /// The credential had expired and was evicted with the cached identity.
    Evicted,
}

impl fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attached => write!(f, "attached"),
            Self::Anonymous => write!(f, "anonymous"),
            Self::Evicted => write!(f, "evicted"),
        }
    }
}

/// Credential state for one login session.
///
/// Constructed when a session starts and consumed by [`SessionContext::logout`].
pub struct SessionContext {
    store: Box<dyn CredentialStore>,
    credential: Option<Credential>,
    identity: Option<UserIdentity>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("credential", &self.credential)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Starts a session from whatever `store` currently holds.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::CredentialStore` if the store cannot be read.
    pub fn start(store: impl CredentialStore + 'static) -> Result<Self> {
        let credential = store.load_credential()?;
        let identity = store.load_identity()?;
        Ok(Self {
            store: Box::new(store),
            credential,
            identity,
        })
    }

    /// Starts a session with nothing stored.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            store: Box::new(MemoryCredentialStore::new()),
            credential: None,
            identity: None,
        }
    }

    /// Stores a freshly acquired credential and identity.
    pub fn login(&mut self, credential: Credential, identity: Option<UserIdentity>) -> Result<()> {
        self.store.save(&credential, identity.as_ref())?;
        self.credential = Some(credential);
        self.identity = identity;
        Ok(())
    }

    /// Replaces the cached identity, keeping the credential.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::NotSignedIn` if no credential is held, since the
    /// identity is only ever stored next to one.
    pub fn remember_identity(&mut self, identity: UserIdentity) -> Result<()> {
        let Some(credential) = &self.credential else {
            return Err(BookingError::NotSignedIn);
        };
        self.store.save(credential, Some(&identity))?;
        self.identity = Some(identity);
        Ok(())
    }

    /// Ends the session and removes everything from the store.
    pub fn logout(mut self) -> Result<()> {
        self.credential = None;
        self.identity = None;
        self.store.clear()
    }

    /// The credential currently held, valid or not.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// The cached identity.
    #[must_use]
    pub const fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// Runs the read-check-evict step and returns the token to attach, if any.
    pub fn authorize(&mut self, now: DateTime<Utc>) -> (Option<&str>, GateOutcome) {
        let Some(expiry) = self.credential.as_ref().map(|c| c.expiry) else {
            return (None, GateOutcome::Anonymous);
        };

        if now < expiry {
            let token = self.credential.as_ref().map(|c| c.token.as_str());
            return (token, GateOutcome::Attached);
        }

        warn!(%expiry, "Evicting expired credential");
        self.credential = None;
        self.identity = None;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear credential store after eviction");
        }
        (None, GateOutcome::Evicted)
    }

    /// Attaches the credential to `request` if it is still valid at `now`.
    ///
    /// The request is never blocked: without a valid credential it is
    /// returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use tutorhub_core::{BearerAuth, Credential, GateOutcome, MemoryCredentialStore, SessionContext};
    ///
    /// struct Headers(Vec<String>);
    ///
    /// impl BearerAuth for Headers {
    ///     fn with_bearer(mut self, token: &str) -> Self {
    ///         self.0.push(format!("Authorization: Bearer {token}"));
    ///         self
    ///     }
    /// }
    ///
    /// let now = Utc::now();
    /// let store = MemoryCredentialStore::with(Credential::new("abc", now + Duration::hours(1)), None);
    /// let mut ctx = SessionContext::start(store).unwrap();
    ///
    /// let (headers, outcome) = ctx.attach_credential_if_valid(Headers(Vec::new()), now);
    /// assert_eq!(outcome, GateOutcome::Attached);
    /// assert_eq!(headers.0, ["Authorization: Bearer abc"]);
    /// ```
    pub fn attach_credential_if_valid<R: BearerAuth>(
        &mut self,
        request: R,
        now: DateTime<Utc>,
    ) -> (R, GateOutcome) {
        let (token, outcome) = self.authorize(now);
        let request = match token {
            Some(token) => request.with_bearer(token),
            None => request,
        };
        debug!(%outcome, "Gate checked outbound request");
        (request, outcome)
    }
}

// ============================================================================
// Tests
// ============================================================================
