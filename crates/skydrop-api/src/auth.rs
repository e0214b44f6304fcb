// OAuth token state
//
// Holds the access/refresh token pair and the access token expiry.
// Nothing here talks to the network; the gateway reads the access token
// on every request and the OAuth endpoints in `oauth.rs` write it back.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Access token lifetime assumed when the server does not send `expires_in`.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// OAuth client credentials issued to the application.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        }
    }
}

/// Access token, refresh token, and access token expiry.
///
/// The expiry is always set. A fresh state expires "now", so it reports
/// expired until a token is stored.
#[derive(Clone)]
pub struct TokenState {
    access: Option<SecretString>,
    refresh: Option<SecretString>,
    expires_at: DateTime<Utc>,
}

impl Default for TokenState {
    fn default() -> Self {
        Self {
            access: None,
            refresh: None,
            expires_at: Utc::now(),
        }
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("access", &self.access.as_ref().map(|_| "[REDACTED]"))
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole triple, e.g. with values persisted by the host.
    pub fn load(
        &mut self,
        access: Option<String>,
        refresh: Option<String>,
        expires_at: DateTime<Utc>,
    ) {
        self.access = access.map(SecretString::from);
        self.refresh = refresh.map(SecretString::from);
        self.expires_at = expires_at;
    }

    /// Restore from an exported snapshot.
    pub fn load_snapshot(&mut self, snapshot: TokenSnapshot) {
        self.load(snapshot.access, snapshot.refresh, snapshot.expires);
    }

    /// Store a new access token valid for `ttl_secs` from now.
    pub fn set_access(&mut self, token: impl Into<String>, ttl_secs: i64) {
        self.access = Some(SecretString::from(token.into()));
        self.expires_at = expiry_from_now(ttl_secs);
    }

    pub fn set_refresh(&mut self, token: impl Into<String>) {
        self.refresh = Some(SecretString::from(token.into()));
    }

    /// `true` once the expiry is at or before the current time.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// `true` when an access token is held (it may still be expired).
    pub fn is_authenticated(&self) -> bool {
        self.access.is_some()
    }

    pub fn access_token(&self) -> Option<&SecretString> {
        self.access.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh.as_ref()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Plain copy of the triple for the host to persist.
    pub fn export(&self) -> TokenSnapshot {
        TokenSnapshot {
            access: self.access.as_ref().map(|s| s.expose_secret().to_owned()),
            refresh: self.refresh.as_ref().map(|s| s.expose_secret().to_owned()),
            expires: self.expires_at,
        }
    }
}

/// Saturates toward the sign of `ttl_secs`: a huge negative TTL is
/// already expired, a huge positive one never is.
fn expiry_from_now(ttl_secs: i64) -> DateTime<Utc> {
    let (bound_delta, bound_time) = if ttl_secs < 0 {
        (TimeDelta::MIN, DateTime::<Utc>::MIN_UTC)
    } else {
        (TimeDelta::MAX, DateTime::<Utc>::MAX_UTC)
    };
    let ttl = TimeDelta::try_seconds(ttl_secs).unwrap_or(bound_delta);
    Utc::now().checked_add_signed(ttl).unwrap_or(bound_time)
}

/// Serializable token triple. `expires` is stored as Unix seconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub access: Option<String>,
    pub refresh: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires: DateTime<Utc>,
}

impl fmt::Debug for TokenSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSnapshot")
            .field("access", &self.access.as_ref().map(|_| "[REDACTED]"))
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .field("expires", &self.expires)
            .finish()
    }
}
