// ── Core error types ──
//
// Transport failures from skydrop-api pass through unchanged so callers
// can still branch on the HTTP status. A convergence timeout is not an
// error by default; `Convergence::into_result` turns it into one for
// callers that want `?` semantics.

use std::time::Duration;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── API errors (status-mapped, never swallowed) ──────────────────
    #[error(transparent)]
    Api(#[from] skydrop_api::Error),

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Zone {zone} not found on controller {controller}")]
    ZoneNotFound { controller: String, zone: u32 },

    // ── Convergence ──────────────────────────────────────────────────
    #[error(
        "{target} did not converge within {timeout:?} (still pending: {})",
        .pending.join(", ")
    )]
    NotConverged {
        target: String,
        pending: Vec<&'static str>,
        timeout: Duration,
    },
}

impl CoreError {
    /// The underlying API error, if this came from the transport.
    pub fn api_error(&self) -> Option<&skydrop_api::Error> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if the access token was rejected.
    pub fn is_auth_expired(&self) -> bool {
        self.api_error().is_some_and(skydrop_api::Error::is_auth_expired)
    }
}
