//! API client with transparent credential refresh.
//!
//! Every request runs through an explicit per-request state machine
//! (`Unsent -> Sent -> RefreshPending -> Retried`) so the one-shot retry
//! guarantee is structural: a request can pass through `RefreshPending`
//! at most once, and a 401 on the retried send surfaces as-is.
//!
//! Refresh is coalesced across concurrent requests: one client-wide async
//! mutex guards the refresh call, and a task that acquires it after a
//! sibling already refreshed skips straight to its retry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::Session;
use crate::config::Config;
use crate::models::{AuthResponse, RefreshResponse, UserProfile};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Auth endpoint paths, relative to the configured base URL
const REGISTER_PATH: &str = "/auth/register/";
const LOGIN_PATH: &str = "/auth/login/";
const LOGOUT_PATH: &str = "/auth/logout/";
const REFRESH_PATH: &str = "/auth/token/refresh/";
const PROFILE_PATH: &str = "/auth/profile/";

/// Per-request lifecycle. `RefreshPending` is reachable only from the first
/// send, which is what bounds recovery to exactly one refresh attempt.
enum RequestPhase {
    Unsent,
    Sent {
        response: Response,
        stale: Option<String>,
    },
    RefreshPending {
        stale: Option<String>,
    },
    Retried,
}

/// API client for the reelstream backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a new API client. The base URL and timeout are fixed for the
    /// lifetime of the client; there is no runtime reconfiguration.
    pub fn new(config: &Config, session: Arc<Session>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session,
            refresh_gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True iff a non-empty access token is stored. No network call.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    // ===== Auth Operations =====

    /// Register a new account. On success the issued credential pair and
    /// profile are persisted and the profile is returned.
    ///
    /// When no username is given the local part of the email is used, which
    /// is what the backend's own clients do.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<UserProfile> {
        let username = username
            .map(str::to_string)
            .unwrap_or_else(|| email_local_part(email));
        let body = json!({
            "email": email,
            "password": password,
            "password2": password,
            "username": username,
        });
        self.send_credentials(REGISTER_PATH, &body).await
    }

    /// Log in with an email and password. On success the issued credential
    /// pair and profile are persisted and the profile is returned.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let body = json!({
            "email": email,
            "password": password,
        });
        self.send_credentials(LOGIN_PATH, &body).await
    }

    /// Log out. The remote notification is best-effort: a network or HTTP
    /// failure there is logged and swallowed. The session is cleared
    /// unconditionally, so `is_authenticated()` is false afterwards no
    /// matter what the backend did.
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh) = self.session.refresh_token() {
            let body = json!({ "refresh_token": refresh });
            let mut request = self.http.post(self.url(LOGOUT_PATH)).json(&body);
            if let Some(token) = self.session.access_token() {
                request = request.bearer_auth(token);
            }
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Logout acknowledged by backend");
                }
                Ok(response) => {
                    warn!(status = %response.status(), "Logout rejected by backend");
                }
                Err(e) => {
                    warn!(error = %e, "Logout notification failed");
                }
            }
        }
        self.session.clear()
    }

    /// Fetch the current user's profile.
    pub async fn profile(&self) -> Result<UserProfile> {
        self.get(PROFILE_PATH).await
    }

    /// Update the current user's profile. The returned record replaces the
    /// stored one.
    pub async fn update_profile<B: Serialize>(&self, changes: &B) -> Result<UserProfile> {
        let updated: UserProfile = self.put(PROFILE_PATH, changes).await?;
        self.session.set_user(updated.clone())?;
        Ok(updated)
    }

    // ===== Request Helpers =====

    /// GET `path` and decode the JSON response body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Method::GET, path, None).await?;
        Self::decode(response, path).await
    }

    /// POST `body` to `path` and decode the JSON response body.
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.execute(Method::POST, path, Some(&body)).await?;
        Self::decode(response, path).await
    }

    /// PUT `body` to `path` and decode the JSON response body.
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.execute(Method::PUT, path, Some(&body)).await?;
        Self::decode(response, path).await
    }

    /// Issue a request through the refresh protocol and return the raw
    /// response once it carries a success status.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response> {
        let mut phase = RequestPhase::Unsent;
        loop {
            phase = match phase {
                RequestPhase::Unsent => {
                    let token = self.session.access_token();
                    let response = self
                        .dispatch(method.clone(), path, body, token.as_deref())
                        .await?;
                    RequestPhase::Sent {
                        response,
                        stale: token,
                    }
                }
                RequestPhase::Sent { response, stale } => {
                    if response.status() == StatusCode::UNAUTHORIZED {
                        debug!(path, "Access token rejected, entering refresh");
                        RequestPhase::RefreshPending { stale }
                    } else {
                        return Self::check(response).await;
                    }
                }
                RequestPhase::RefreshPending { stale } => {
                    self.refresh_access_token(stale.as_deref()).await?;
                    RequestPhase::Retried
                }
                RequestPhase::Retried => {
                    let token = self.session.access_token();
                    let response = self
                        .dispatch(method.clone(), path, body, token.as_deref())
                        .await?;
                    // One retry only: a second rejection surfaces as-is.
                    return Self::check(response).await;
                }
            };
        }
    }

    /// Send a single request, attaching the given bearer token when present.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Response> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(ApiError::Network)?;
        Ok(response)
    }

    /// Refresh the access token, coalescing concurrent attempts.
    ///
    /// `stale` is the token the failing request presented. If the stored
    /// token no longer matches it by the time the gate is acquired, another
    /// task already refreshed and this one can retry immediately.
    ///
    /// Any refresh failure clears the whole session and surfaces
    /// `ApiError::SessionExpired`.
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<()> {
        let _gate = self.refresh_gate.lock().await;

        match self.session.access_token() {
            // A sibling refreshed successfully while we waited on the gate.
            Some(current) if Some(current.as_str()) != stale => {
                debug!("Coalesced onto a refresh completed by another request");
                return Ok(());
            }
            // We presented a token but the store is empty now: a sibling's
            // refresh failed and cleared the session. Waiters share that
            // outcome rather than retrying unauthenticated.
            None if stale.is_some() => {
                debug!("Coalesced onto a refresh that already expired the session");
                return Err(ApiError::SessionExpired.into());
            }
            // Still holding the stale token (or never had one): refresh.
            _ => {}
        }

        let Some(refresh) = self.session.refresh_token() else {
            warn!("No refresh token stored, expiring session");
            self.session.clear()?;
            return Err(ApiError::SessionExpired.into());
        };

        let result = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await;

        let response = match result {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "Refresh token rejected, expiring session");
                self.session.clear()?;
                return Err(ApiError::SessionExpired.into());
            }
            Err(e) => {
                warn!(error = %e, "Refresh request failed, expiring session");
                self.session.clear()?;
                return Err(ApiError::SessionExpired.into());
            }
        };

        let Ok(issued) = response.json::<RefreshResponse>().await else {
            warn!("Unparseable refresh response, expiring session");
            self.session.clear()?;
            return Err(ApiError::SessionExpired.into());
        };

        self.session.set_access_token(issued.access)?;
        if let Some(rotated) = issued.refresh {
            self.session.set_refresh_token(rotated)?;
        }
        debug!("Access token refreshed");
        Ok(())
    }

    /// Login/register share one send path. These endpoints bypass the
    /// refresh protocol: a 401 here means rejected credentials, and the
    /// remote error payload must reach the caller verbatim either way.
    async fn send_credentials(&self, path: &str, body: &Value) -> Result<UserProfile> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::remote(status, &text).into());
        }

        let auth: AuthResponse = Self::decode(response, path).await?;
        self.session.establish(auth.tokens, auth.user.clone())?;
        debug!(path, "Session established");
        Ok(auth.user)
    }

    /// Map a non-success response to its error; 401 here means the one
    /// permitted retry has already happened.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &text).into())
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
        let text = response.text().await.map_err(ApiError::Network)?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to decode response from {path}: {e}")).into()
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Local part of an email address, used as the default username.
fn email_local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
