//! Authenticated-session request pipeline.
//!
//! Wraps portal API calls with bearer-token attachment and a one-shot
//! silent refresh-and-retry on 401. Unrecoverable refresh failures purge
//! the token store and broadcast a session-terminated signal; navigation
//! is left to observers.

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, watch};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use store::{StoredToken, TokenKind, TokenStore};

/// Access tokens live for one hour.
const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
/// Refresh tokens live for a day by default.
const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// With "remember me", refresh tokens live for thirty days.
const REFRESH_TOKEN_TTL_REMEMBER: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Token-issuance endpoint.
const TOKEN_PATH: &str = "/api/token/";
/// Token-refresh endpoint.
const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";
/// Login route observers send users to after session termination.
const LOGIN_ROUTE: &str = "/login";

/// A credential pair issued at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Short-lived bearer token attached to API calls
    pub access: String,
    /// Long-lived token used solely to mint new access tokens
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Broadcast when the session cannot be recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpiry {
    /// Path of the request that hit the terminal failure
    pub next: Option<String>,
}

impl SessionExpiry {
    /// Renders the conventional login route, carrying the return path
    /// as a `next` query parameter when one is known.
    pub fn login_route(&self) -> String {
        match self.next.as_deref() {
            Some(next) => {
                let query: String = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("next", next)
                    .finish();
                format!("{LOGIN_ROUTE}?{query}")
            }
            None => LOGIN_ROUTE.to_string(),
        }
    }
}

/// An outbound portal request.
///
/// Captures everything needed to dispatch the call again on retry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    /// Creates a request for `path`, which must start with `/`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    /// Returns an error if the body cannot be serialized.
    pub fn json<B: Serialize>(mut self, body: &B) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::internal(format!("serialize request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Path this request targets, relative to the base address.
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn store_err(err: anyhow::Error) -> ApiError {
    ApiError::internal(format!("token store: {err:#}"))
}

/// Portal API client with automatic bearer attachment and 401 recovery.
///
/// Callers never see the token lifecycle: an expired access token is
/// refreshed once behind the scenes and the original call retried. The
/// token store is injected so tests can run against an in-memory fake.
pub struct SessionClient {
    base_url: String,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    refresh_gate: Mutex<()>,
    expired_tx: watch::Sender<Option<SessionExpiry>>,
}

impl SessionClient {
    /// Creates a client from the given config and token store.
    ///
    /// # Errors
    /// Returns an error if the configured base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let base_url = config.resolve_base_url()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build http client")?;

        let (expired_tx, _) = watch::channel(None);

        Ok(Self {
            base_url,
            http,
            store,
            refresh_gate: Mutex::new(()),
            expired_tx,
        })
    }

    /// Base address requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Watches for session termination.
    ///
    /// The payload carries the path of the request that hit the terminal
    /// failure, for building the post-login return hint. Login resets the
    /// value to None.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionExpiry>> {
        self.expired_tx.subscribe()
    }

    /// Issues a request through the session pipeline.
    ///
    /// Attaches the stored access token when present, recovers from a
    /// single 401 via refresh-and-retry, and returns every other response
    /// unchanged, whatever its status.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<reqwest::Response> {
        let mut retried = false;
        let mut access = self.access_token()?;

        loop {
            let response = self.dispatch(&request, access.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED || retried {
                return Ok(response);
            }

            // One refresh cycle per original request.
            retried = true;
            access = Some(self.refresh_access(access.as_deref(), &request.path).await?);
        }
    }

    /// Sends a request and decodes a JSON success body.
    pub async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let response = self.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http_status(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::parse(format!("decode response: {e}")))
    }

    /// Sends a request, discarding the success body.
    pub async fn request_unit(&self, request: ApiRequest) -> ApiResult<()> {
        let response = self.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http_status(status.as_u16(), &body));
        }
        Ok(())
    }

    /// GETs `path` and decodes a JSON success body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request_json(ApiRequest::get(path)).await
    }

    /// POSTs a JSON payload to `path` and decodes a JSON success body.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.request_json(ApiRequest::post(path).json(body)?).await
    }

    /// POSTs a JSON payload to `path`, discarding the success body.
    pub async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<()> {
        self.request_unit(ApiRequest::post(path).json(body)?).await
    }

    /// Authenticates with the portal and stores the issued credential pair.
    ///
    /// `remember` selects the 30-day refresh TTL instead of the 1-day one;
    /// the access TTL is one hour either way. Stored state is untouched
    /// when the credentials are rejected.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> ApiResult<Credentials> {
        let response = self
            .http
            .post(format!("{}{TOKEN_PATH}", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::invalid_credentials());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http_status(status.as_u16(), &body));
        }

        let pair: TokenPairResponse = response
            .json()
            .await
            .map_err(|e| ApiError::parse(format!("decode token response: {e}")))?;

        let refresh_ttl = if remember {
            REFRESH_TOKEN_TTL_REMEMBER
        } else {
            REFRESH_TOKEN_TTL
        };
        self.store
            .set(
                TokenKind::Access,
                StoredToken::new(&pair.access, ACCESS_TOKEN_TTL),
            )
            .map_err(store_err)?;
        self.store
            .set(
                TokenKind::Refresh,
                StoredToken::new(&pair.refresh, refresh_ttl),
            )
            .map_err(store_err)?;
        self.expired_tx.send_replace(None);

        tracing::debug!(remember, "signed in");
        Ok(Credentials {
            access: pair.access,
            refresh: pair.refresh,
        })
    }

    /// Clears the stored credential pair without calling the server.
    ///
    /// Idempotent: succeeds when nothing is stored.
    pub fn logout(&self) -> ApiResult<()> {
        self.store.clear().map_err(store_err)?;
        tracing::debug!("signed out");
        Ok(())
    }

    fn access_token(&self) -> ApiResult<Option<String>> {
        Ok(self
            .store
            .get(TokenKind::Access)
            .map_err(store_err)?
            .map(|token| token.value))
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        access: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = access {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        Ok(builder.send().await?)
    }

    /// Mints a new access token, deduplicating concurrent refreshes.
    ///
    /// Returns the token to retry with. Terminal failures purge the store,
    /// broadcast the expiry signal and surface as `SessionExpired`.
    async fn refresh_access(
        &self,
        sent_access: Option<&str>,
        origin: &str,
    ) -> ApiResult<String> {
        let _gate = self.refresh_gate.lock().await;

        // Another request may have refreshed while we waited on the gate.
        match self.store.get(TokenKind::Access) {
            Ok(Some(current)) if sent_access != Some(current.value.as_str()) => {
                return Ok(current.value);
            }
            Ok(_) => {}
            Err(e) => return Err(self.store_failed(&e, origin)),
        }

        let refresh = match self.store.get(TokenKind::Refresh) {
            Ok(Some(refresh)) => refresh,
            Ok(None) => {
                tracing::warn!(origin, "no refresh token, terminating session");
                return Err(self.terminate(origin));
            }
            Err(e) => return Err(self.store_failed(&e, origin)),
        };

        let result = self
            .http
            .post(format!("{}{TOKEN_REFRESH_PATH}", self.base_url))
            .json(&serde_json::json!({ "refresh": refresh.value }))
            .send()
            .await;

        let response = match result {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::warn!(status, origin, "token refresh rejected, terminating session");
                return Err(self.terminate(origin));
            }
            Err(e) => {
                tracing::warn!(error = %e, origin, "token refresh failed, terminating session");
                return Err(self.terminate(origin));
            }
        };

        let refreshed: RefreshResponse = match response.json().await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    origin,
                    "malformed refresh response, terminating session"
                );
                return Err(self.terminate(origin));
            }
        };

        if let Err(e) = self.store.set(
            TokenKind::Access,
            StoredToken::new(&refreshed.access, ACCESS_TOKEN_TTL),
        ) {
            return Err(self.store_failed(&e, origin));
        }

        tracing::debug!("access token refreshed");
        Ok(refreshed.access)
    }

    /// Terminal path for a token store that fails mid-refresh.
    fn store_failed(&self, err: &anyhow::Error, origin: &str) -> ApiError {
        tracing::warn!(error = %err, origin, "token store unusable, terminating session");
        self.terminate(origin)
    }

    /// Purges the store and broadcasts the session-terminated signal.
    fn terminate(&self, origin: &str) -> ApiError {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear token store");
        }
        self.expired_tx.send_replace(Some(SessionExpiry {
            next: Some(origin.to_string()),
        }));
        ApiError::session_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::store::MemoryTokenStore;
    use super::*;

    fn test_client() -> SessionClient {
        SessionClient::new(&Config::default(), Arc::new(MemoryTokenStore::new())).unwrap()
    }

    /// Login route carries the origin path urlencoded under `next`.
    #[test]
    fn test_login_route_with_next() {
        let expiry = SessionExpiry {
            next: Some("/api/events/".to_string()),
        };
        assert_eq!(expiry.login_route(), "/login?next=%2Fapi%2Fevents%2F");
    }

    /// Login route without an origin is the bare route.
    #[test]
    fn test_login_route_without_next() {
        let expiry = SessionExpiry { next: None };
        assert_eq!(expiry.login_route(), "/login");
    }

    /// Request builder accumulates query pairs and serializes bodies.
    #[test]
    fn test_api_request_builder() {
        let request = ApiRequest::post("/api/registrations/")
            .query("page", "2")
            .json(&serde_json::json!({ "event": 7 }))
            .unwrap();

        assert_eq!(request.path(), "/api/registrations/");
        assert_eq!(request.query, vec![("page".to_string(), "2".to_string())]);
        assert_eq!(request.body, Some(serde_json::json!({ "event": 7 })));
    }

    /// Logout succeeds on an empty store and twice in a row.
    #[test]
    fn test_logout_idempotent() {
        let client = test_client();
        client.logout().unwrap();
        client.logout().unwrap();
    }

    /// No termination has been signalled on a fresh client.
    #[test]
    fn test_subscribe_starts_empty() {
        let client = test_client();
        assert_eq!(*client.subscribe().borrow(), None);
    }

    /// Termination purges the store and publishes the origin path.
    #[test]
    fn test_terminate_purges_and_signals() {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .set(TokenKind::Access, StoredToken::new("A1", ACCESS_TOKEN_TTL))
            .unwrap();
        let client =
            SessionClient::new(&Config::default(), Arc::clone(&store) as Arc<dyn TokenStore>)
                .unwrap();

        let err = client.terminate("/api/events/");

        assert_eq!(err.kind, crate::error::ApiErrorKind::SessionExpired);
        assert_eq!(store.get(TokenKind::Access).unwrap(), None);
        let expiry = client.subscribe().borrow().clone().unwrap();
        assert_eq!(expiry.next.as_deref(), Some("/api/events/"));
        assert_eq!(expiry.login_route(), "/login?next=%2Fapi%2Fevents%2F");
    }
}
