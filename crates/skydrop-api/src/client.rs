// Skydrop API HTTP client
//
// Wraps `reqwest::Client` with base-URL path construction, bearer-token
// headers, and status-to-error mapping. Endpoint modules (controllers,
// oauth) are implemented as inherent methods in separate files to keep
// this module focused on transport mechanics.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{ClientCredentials, TokenState};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Root of the public Skydrop API.
pub const DEFAULT_BASE_URL: &str = "https://api.skydrop.com/";

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Raw HTTP gateway for the Skydrop cloud API.
///
/// Holds the session's token state; every request reads the current access
/// token for its `Authorization` header. Tokens are never refreshed
/// implicitly; callers check [`is_token_expired`](Self::is_token_expired)
/// and call [`refresh_access_token`](Self::refresh_access_token) themselves.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: ClientCredentials,
    tokens: RwLock<TokenState>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &self.credentials.client_id)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(
        base_url: Url,
        credentials: ClientCredentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: ClientCredentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
            tokens: RwLock::new(TokenState::new()),
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    // ── Token state ──────────────────────────────────────────────────

    /// Shared read access to the token state.
    pub fn tokens(&self) -> RwLockReadGuard<'_, TokenState> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the token state.
    pub fn tokens_mut(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_token_expired(&self) -> bool {
        self.tokens().is_expired()
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build `{base}/{path}` regardless of a trailing slash on the base.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Headers ──────────────────────────────────────────────────────

    /// JSON content type plus the bearer token when one is held.
    ///
    /// Callers of the `*_with_headers` helpers can start from this map.
    pub fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        if let Some(token) = self.tokens().access_token() {
            match HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => debug!("access token is not a valid header value; sending without it"),
            }
        }
        headers
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request with the default headers and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        self.get_with_headers(url, self.default_headers()).await
    }

    /// Send a GET request with `headers` in place of the defaults.
    pub async fn get_with_headers<T: DeserializeOwned>(
        &self,
        url: Url,
        headers: HeaderMap,
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).headers(headers).send().await?;

        Self::handle_response(resp).await
    }

    /// Send a bodiless POST request with the default headers.
    pub async fn post<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        self.post_with_headers(url, self.default_headers()).await
    }

    /// Send a bodiless POST request with `headers` in place of the defaults.
    pub async fn post_with_headers<T: DeserializeOwned>(
        &self,
        url: Url,
        headers: HeaderMap,
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self.http.post(url).headers(headers).send().await?;

        Self::handle_response(resp).await
    }

    /// Send a form-encoded POST request.
    ///
    /// Replaces the default headers: no bearer token, form content type.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &(impl Serialize + Sync + ?Sized),
    ) -> Result<T, Error> {
        debug!("POST (form) {}", url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM));

        let resp = self.http.post(url).headers(headers).form(form).send().await?;

        Self::handle_response(resp).await
    }

    /// Send a PUT request with a JSON body and the default headers.
    pub async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync + ?Sized),
    ) -> Result<T, Error> {
        self.put_with_headers(url, self.default_headers(), body).await
    }

    /// Send a PUT request with a JSON body and `headers` in place of the
    /// defaults.
    pub async fn put_with_headers<T: DeserializeOwned>(
        &self,
        url: Url,
        headers: HeaderMap,
        body: &(impl Serialize + Sync + ?Sized),
    ) -> Result<T, Error> {
        debug!("PUT {}", url);

        let resp = self.http.put(url).headers(headers).json(body).send().await?;

        Self::handle_response(resp).await
    }

    /// Decode a 2xx body as JSON, or map the status to an [`Error`]
    /// carrying the raw body text.
    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            trace!(status = status.as_u16(), %body, "request failed");
            return Err(Error::from_status(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| {
            let preview = body.chars().take(200).collect::<String>();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            ClientCredentials::new("id", "secret"),
        )
    }

    #[test]
    fn api_url_handles_trailing_slash() {
        let with = client("https://api.skydrop.com/");
        let without = client("https://api.skydrop.com");
        assert_eq!(
            with.api_url("users/get.controller.ids").unwrap().as_str(),
            "https://api.skydrop.com/users/get.controller.ids"
        );
        assert_eq!(
            without.api_url("/oauth/token").unwrap().as_str(),
            "https://api.skydrop.com/oauth/token"
        );
    }

    #[test]
    fn api_url_keeps_base_path_prefix() {
        let c = client("http://localhost:9000/v1/");
        assert_eq!(
            c.api_url("controllers/abc/all.config").unwrap().as_str(),
            "http://localhost:9000/v1/controllers/abc/all.config"
        );
    }

    #[test]
    fn default_headers_include_bearer_only_when_authenticated() {
        let c = client(DEFAULT_BASE_URL);
        let headers = c.default_headers();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), JSON);
        assert!(headers.get(AUTHORIZATION).is_none());

        c.tokens_mut().set_access("tok", 60);
        let headers = c.default_headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
    }
}
