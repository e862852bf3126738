// src/api/client.rs

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use url::Url;

use crate::config::Config;
use crate::error::ClientError;
use crate::session::store::SessionStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared REST plumbing for every backend collaborator: base-URL joining,
/// bearer headers read from the session store, and uniform error mapping.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) http: reqwest::Client,
    base_url: Url,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) submit_quiz_requires_auth: bool,
    /// When the free explainer endpoint rate-limits us, remembered here so
    /// the next call can go straight to the keyed fallback provider.
    pub(crate) ai_rate_limited_at: Arc<Mutex<Option<Instant>>>,
}

impl ApiClient {
    pub fn new(config: &Config, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        // A trailing slash makes Url::join treat the last segment as a
        // directory, which is what relative endpoint paths need.
        let mut base = config.api_base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ClientError::Validation(format!("invalid API base URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            http,
            base_url,
            store,
            submit_quiz_requires_auth: config.submit_quiz_requires_auth,
            ai_rate_limited_at: Arc::new(Mutex::new(None)),
        })
    }

    /// Joins an endpoint path onto the base URL. An unjoinable path is an
    /// error; a request must never silently go to the bare base instead.
    pub(crate) fn url(&self, path: &str) -> Result<Url, ClientError> {
        let relative = path.trim_start_matches('/');
        self.base_url
            .join(relative)
            .map_err(|e| ClientError::Validation(format!("invalid endpoint path {}: {}", path, e)))
    }

    /// The bearer token, or `AuthRequired` when nobody is logged in.
    pub(crate) fn bearer(&self) -> Result<String, ClientError> {
        self.store
            .load()
            .token()
            .map(|t| format!("Bearer {}", t))
            .ok_or(ClientError::AuthRequired)
    }

    /// Maps a non-2xx response into `ApiStatus`, preferring the body's
    /// `error`/`message` field over the bare status text.
    pub(crate) async fn check(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(ClientError::ApiStatus(status.as_u16(), message))
    }
}
