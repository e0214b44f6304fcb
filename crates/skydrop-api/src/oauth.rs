// OAuth token endpoints
//
// Authorization-code exchange and refresh-token exchange. Both post a
// form to `oauth/token` and store whatever tokens come back in the
// client's token state.

use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::auth::DEFAULT_TOKEN_TTL_SECS;
use crate::client::ApiClient;
use crate::error::Error;
use crate::models::TokenResponse;

impl ApiClient {
    /// Exchange an authorization code for an access/refresh token pair.
    ///
    /// `POST oauth/token` with `grant_type=authorization_code`
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let url = self.api_url("oauth/token")?;
        debug!("exchanging authorization code");

        let creds = self.credentials();
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.expose_secret()),
        ];

        let resp: TokenResponse = self.post_form(url, &form).await?;
        self.store_tokens(&resp);
        Ok(resp)
    }

    /// Trade a refresh token for a new access token.
    ///
    /// Uses `refresh_token` when given, otherwise the stored one.
    /// `POST oauth/token` with `grant_type=refresh_token`
    pub async fn refresh_access_token(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<TokenResponse, Error> {
        let refresh_token = match refresh_token {
            Some(token) => token.to_owned(),
            None => self
                .tokens()
                .refresh_token()
                .map(|t| t.expose_secret().to_owned())
                .ok_or(Error::MissingRefreshToken)?,
        };

        let url = self.api_url("oauth/token")?;
        debug!("refreshing access token");

        let creds = self.credentials();
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.expose_secret()),
        ];

        let resp: TokenResponse = self.post_form(url, &form).await?;
        self.store_tokens(&resp);
        Ok(resp)
    }

    fn store_tokens(&self, resp: &TokenResponse) {
        let mut tokens = self.tokens_mut();
        if let Some(access) = &resp.access_token {
            let ttl = resp.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
            tokens.set_access(access.clone(), ttl);
            info!(expires_in = ttl, "stored new access token");
        }
        if let Some(refresh) = &resp.refresh_token {
            tokens.set_refresh(refresh.clone());
        }
    }
}
