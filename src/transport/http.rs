//! reqwest-backed HTTP transport.
//!
//! Owns the retry/timeout policy for the wire: idempotent GETs are
//! retried a small fixed number of times on transient network failure,
//! state-changing calls are never retried automatically. Every exchange
//! is logged at debug level including the serialized body; credentials
//! are never written to logs.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{HttpMethod, WireReply};

use super::{Timeouts, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Extra attempts for idempotent GETs on transient network failure.
const DEFAULT_RETRY_ATTEMPTS: u32 = 2;

/// Delay between retry attempts.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// TCP connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// BasicAuth
// ============================================================================

/// Basic-auth credentials.
///
/// The secret is redacted from `Debug` output so transport state can be
/// logged without leaking it.
#[derive(Clone)]
struct BasicAuth {
    user: String,
    secret: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// TransportConfig
// ============================================================================

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Remote end base URL (e.g. `http://localhost:4444`).
    base_url: Url,
    /// Optional basic-auth credentials.
    basic_auth: Option<BasicAuth>,
    /// Per-class deadlines.
    timeouts: Timeouts,
    /// Extra attempts for idempotent GETs.
    retry_attempts: u32,
    /// Delay between retry attempts.
    retry_delay: Duration,
}

impl TransportConfig {
    /// Creates a configuration for the given remote end URL.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the URL does not parse or is not http(s).
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid server URL {base_url}: {e}")))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "server URL must be http or https: {base_url}"
            )));
        }

        Ok(Self {
            base_url,
            basic_auth: None,
            timeouts: Timeouts::default(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Sets basic-auth credentials for the remote end.
    #[must_use]
    pub fn with_basic_auth(mut self, user: impl Into<String>, secret: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            user: user.into(),
            secret: secret.into(),
        });
        self
    }

    /// Overrides the per-class deadlines.
    #[inline]
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Overrides the retry policy for idempotent GETs.
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Returns the configured per-class deadlines.
    #[inline]
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// Production transport over reqwest.
///
/// # Thread Safety
///
/// `HttpTransport` is `Send + Sync`; reqwest's client is internally
/// pooled and cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Creates a transport from a configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the underlying HTTP client cannot be built.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Joins the base URL with an endpoint path.
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Runs one request attempt.
    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        deadline: Duration,
    ) -> Result<WireReply> {
        let url = self.endpoint(path);
        let reqwest_method = match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut request = self
            .client
            .request(reqwest_method, &url)
            .timeout(deadline);

        if let Some(auth) = &self.config.basic_auth {
            request = request.basic_auth(&auth.user, Some(&auth.secret));
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(method = method.as_str(), %url, body = ?body, "Sending request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("{} {path}", method.as_str()),
                    deadline.as_millis() as u64,
                )
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(Error::Http)?;

        // Some remote ends reply with an empty body on DELETE.
        let body = if text.trim().is_empty() {
            serde_json::json!({ "value": null })
        } else {
            serde_json::from_str(&text).map_err(|_| {
                Error::protocol("malformed body", "response body is not JSON", status, text)
            })?
        };

        debug!(status, body = %body, "Received response");

        Ok(WireReply::new(status, body))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        deadline: Duration,
    ) -> Result<WireReply> {
        with_retries(
            total_attempts(method, self.config.retry_attempts),
            self.config.retry_delay,
            is_transient,
            || self.execute(method, path, body.as_ref(), deadline),
        )
        .await
    }
}

// ============================================================================
// Retry Policy
// ============================================================================

/// Total attempts allowed for a request.
///
/// State-changing calls get exactly one attempt: a blind retry of a
/// PUT/POST risks double-applying it on the remote end.
fn total_attempts(method: HttpMethod, retries: u32) -> u32 {
    if method.is_idempotent() { 1 + retries } else { 1 }
}

/// Returns `true` if the error may succeed on a fresh connection.
fn is_transient(error: &Error) -> bool {
    matches!(error, Error::Http(e) if e.is_connect() || e.is_request())
}

/// Runs `call` up to `attempts` times, sleeping `delay` between tries.
///
/// Only errors `transient` classifies as retryable are tried again; the
/// rest surface immediately.
async fn with_retries<F, Fut, P>(
    attempts: u32,
    delay: Duration,
    transient: P,
    mut call: F,
) -> Result<WireReply>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<WireReply>>,
    P: Fn(&Error) -> bool,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(reply) => return Ok(reply),
            Err(error) if attempt < attempts && transient(&error) => {
                warn!(
                    attempt,
                    attempts,
                    error = %error,
                    "Transient network failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
