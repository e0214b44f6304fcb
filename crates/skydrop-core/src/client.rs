// ── Client session ──
//
// Top-level session: owns the API gateway (and with it the token state)
// and the ordered controller collection. Discovery prefers the
// multi-controller listing and falls back, permanently, to the
// single-controller endpoint the first time the listing times out
// upstream.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use skydrop_api::models::TokenResponse;
use skydrop_api::{ApiClient, ClientCredentials, TokenSnapshot, TransportConfig};
use tracing::{debug, info};

use crate::config::{ClientConfig, ConvergencePolicy};
use crate::controller::Controller;
use crate::error::CoreError;

/// A logged-in (or logging-in) user session.
#[derive(Debug)]
pub struct Client {
    api: Arc<ApiClient>,
    policy: ConvergencePolicy,
    controllers: Vec<Controller>,
    single_controller_mode: bool,
}

impl Client {
    /// Build a session from configuration. Does not touch the network.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let credentials = ClientCredentials {
            client_id: config.client_id,
            client_secret: config.client_secret,
        };
        let transport = TransportConfig::with_timeout(config.timeout);
        let api = ApiClient::new(config.base_url, credentials, &transport)?;
        Ok(Self::with_api(api, config.convergence))
    }

    /// Build a session around an existing gateway.
    pub fn with_api(api: ApiClient, policy: ConvergencePolicy) -> Self {
        Self {
            api: Arc::new(api),
            policy,
            controllers: Vec::new(),
            single_controller_mode: false,
        }
    }

    /// The shared API gateway.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// `true` once discovery has fallen back to the single-controller endpoint.
    pub fn is_single_controller_mode(&self) -> bool {
        self.single_controller_mode
    }

    // ── Controllers ──────────────────────────────────────────────────

    /// Controllers in discovery order.
    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn controllers_mut(&mut self) -> &mut [Controller] {
        &mut self.controllers
    }

    pub fn controller(&self, id: &str) -> Option<&Controller> {
        self.controllers.iter().find(|c| c.id() == id)
    }

    pub fn controller_mut(&mut self, id: &str) -> Option<&mut Controller> {
        self.controllers.iter_mut().find(|c| c.id() == id)
    }

    /// Discover controllers, add unseen ones, and refresh every known one.
    ///
    /// A 504 from the multi-controller listing switches the session to
    /// single-controller mode for good and retries on that endpoint.
    /// Any other error propagates.
    pub async fn discover_controllers(&mut self) -> Result<&mut [Controller], CoreError> {
        let discovered = if self.single_controller_mode {
            self.discover_single().await?
        } else {
            match self.api.list_controller_ids().await {
                Ok(resp) => resp
                    .controller_ids
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|entry| entry.public_controller_id.map(|id| (id, entry.name)))
                    .collect(),
                Err(e) if e.is_gateway_timeout() => {
                    info!("controller listing timed out upstream; switching to single-controller mode");
                    self.single_controller_mode = true;
                    self.discover_single().await?
                }
                Err(e) => return Err(e.into()),
            }
        };

        for (id, name) in discovered {
            if self.controller(&id).is_none() {
                debug!(controller = %id, "discovered controller");
                self.controllers.push(Controller::new(
                    id,
                    name,
                    Arc::clone(&self.api),
                    self.policy,
                ));
            }
        }

        for controller in &mut self.controllers {
            controller.refresh().await?;
        }

        Ok(self.controllers.as_mut_slice())
    }

    async fn discover_single(&self) -> Result<Vec<(String, Option<String>)>, CoreError> {
        let resp = self.api.default_controller_id().await?;
        Ok(resp
            .controller_id
            .map(|id| (id, resp.name))
            .into_iter()
            .collect())
    }

    // ── Tokens ───────────────────────────────────────────────────────

    /// Exchange an OAuth authorization code and store the tokens.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
    ) -> Result<TokenResponse, CoreError> {
        Ok(self.api.exchange_authorization_code(code).await?)
    }

    /// Refresh the access token with `refresh_token` or the stored one.
    pub async fn refresh_token(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<TokenResponse, CoreError> {
        Ok(self.api.refresh_access_token(refresh_token).await?)
    }

    pub fn is_token_expired(&self) -> bool {
        self.api.is_token_expired()
    }

    /// Store an access token valid for `ttl_secs` from now.
    pub fn set_access_token(&self, token: impl Into<String>, ttl_secs: i64) {
        self.api.tokens_mut().set_access(token, ttl_secs);
    }

    pub fn set_refresh_token(&self, token: impl Into<String>) {
        self.api.tokens_mut().set_refresh(token);
    }

    /// Restore a token triple persisted by the host.
    pub fn load_tokens(&self, snapshot: TokenSnapshot) {
        self.api.tokens_mut().load_snapshot(snapshot);
    }

    /// Copy of the token triple for the host to persist.
    pub fn export_tokens(&self) -> TokenSnapshot {
        self.api.tokens().export()
    }

    pub fn token_expires_at(&self) -> DateTime<Utc> {
        self.api.tokens().expires_at()
    }

    pub fn access_token(&self) -> Option<String> {
        self.api
            .tokens()
            .access_token()
            .map(|t| t.expose_secret().to_owned())
    }
}
