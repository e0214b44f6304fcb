use thiserror::Error;

/// Top-level error type for the `skydrop-api` crate.
///
/// Every non-2xx response is mapped to a status-specific variant carrying
/// the raw response body. `skydrop-core` wraps these without translation
/// so callers can still branch on the HTTP status.
#[derive(Debug, Error)]
pub enum Error {
    // ── HTTP status ─────────────────────────────────────────────────
    /// HTTP 400: request is malformed.
    #[error("Bad request (HTTP 400): {body}")]
    BadRequest { body: String },

    /// HTTP 401: access token missing, expired or revoked.
    #[error("Unauthorized (HTTP 401): {body}")]
    Unauthorized { body: String },

    /// HTTP 403: access is prohibited.
    #[error("Forbidden (HTTP 403): {body}")]
    Forbidden { body: String },

    /// HTTP 429: too many requests for this time period.
    #[error("Too many requests (HTTP 429): {body}")]
    TooManyRequests { body: String },

    /// HTTP 500: server internal error.
    #[error("Internal server error (HTTP 500): {body}")]
    InternalServerError { body: String },

    /// HTTP 504: the upstream gateway gave up on the request.
    #[error("Gateway timeout (HTTP 504): {body}")]
    GatewayTimeout { body: String },

    /// Any other non-2xx status.
    #[error("Client error (HTTP {status}): {body}")]
    Client { status: u16, body: String },

    // ── Authentication ──────────────────────────────────────────────
    /// A token refresh was requested with no refresh token available.
    #[error("No refresh token provided")]
    MissingRefreshToken,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Map a non-2xx status and its body to the matching variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => Self::BadRequest { body },
            401 => Self::Unauthorized { body },
            403 => Self::Forbidden { body },
            429 => Self::TooManyRequests { body },
            500 => Self::InternalServerError { body },
            504 => Self::GatewayTimeout { body },
            status => Self::Client { status, body },
        }
    }

    /// The HTTP status behind this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { .. } => Some(400),
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::TooManyRequests { .. } => Some(429),
            Self::InternalServerError { .. } => Some(500),
            Self::GatewayTimeout { .. } => Some(504),
            Self::Client { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The raw response body, for status-mapped errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::BadRequest { body }
            | Self::Unauthorized { body }
            | Self::Forbidden { body }
            | Self::TooManyRequests { body }
            | Self::InternalServerError { body }
            | Self::GatewayTimeout { body }
            | Self::Client { body, .. }
            | Self::Deserialization { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` if the access token was rejected and a token
    /// refresh might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` for the upstream gateway timeout (HTTP 504).
    pub fn is_gateway_timeout(&self) -> bool {
        matches!(self, Self::GatewayTimeout { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::TooManyRequests { .. } | Self::GatewayTimeout { .. } => true,
            _ => false,
        }
    }
}
