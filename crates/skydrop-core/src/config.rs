// ── Runtime client configuration ──
//
// These types describe *how* to talk to the Skydrop service. They carry
// credentials and tuning, but never touch disk. Hosts (or skydrop-config)
// construct a `ClientConfig` and hand it in.

use std::time::Duration;

use secrecy::SecretString;
use skydrop_api::DEFAULT_BASE_URL;
use url::Url;

/// Poll interval and deadline for confirming configuration writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergencePolicy {
    /// Delay before each re-fetch of the written resource.
    pub poll_interval: Duration,
    /// Budget measured from the initial write.
    pub timeout: Duration,
}

impl ConvergencePolicy {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Configuration for one client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root (defaults to `https://api.skydrop.com/`).
    pub base_url: Url,
    /// OAuth application id.
    pub client_id: String,
    /// OAuth application secret.
    pub client_secret: SecretString,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Write-confirmation policy applied to every controller.
    pub convergence: ConvergencePolicy,
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            timeout: Duration::from_secs(30),
            convergence: ConvergencePolicy::default(),
        }
    }
}

/// The public API root as a parsed URL.
pub fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_policy() {
        let policy = ConvergencePolicy::default();
        assert_eq!(policy.poll_interval, Duration::from_secs(1));
        assert_eq!(policy.timeout, Duration::from_secs(20));

        let cfg = ClientConfig::new("id", "secret");
        assert_eq!(cfg.base_url.as_str(), "https://api.skydrop.com/");
        assert_eq!(cfg.convergence, policy);
    }

    #[test]
    fn with_timeout_keeps_interval() {
        let policy = ConvergencePolicy::default().with_timeout(Duration::from_secs(5));
        assert_eq!(policy.timeout, Duration::from_secs(5));
        assert_eq!(policy.poll_interval, Duration::from_secs(1));
    }
}
