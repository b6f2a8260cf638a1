//! Vendor session-status REST API and lifecycle reporting.
//!
//! BrowserStack-shaped collaborator: session status and naming are
//! reported over a REST API that sits outside the WebDriver protocol
//! (`PUT <base>/sessions/:id.json`). The [`StatusReporter`] drives it
//! from test lifecycle hooks; a vendor-reporting failure is logged and
//! swallowed, never surfaced, because it must not fail the caller's
//! test run.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::session::Session;

// ============================================================================
// Constants
// ============================================================================

/// REST base for browser sessions.
pub const AUTOMATE_API_BASE: &str = "https://api.browserstack.com/automate";

/// REST base for mobile-app sessions.
pub const APP_AUTOMATE_API_BASE: &str = "https://api-cloud.browserstack.com/app-automate";

/// Deadline for one vendor REST exchange.
const VENDOR_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Wire Types
// ============================================================================

/// Final session verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Passed,
    Failed,
}

/// Body of a session-status update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    /// Verdict to record.
    pub status: SessionStatus,
    /// Session display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Failure reason; only meaningful with [`SessionStatus::Failed`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusUpdate {
    /// Creates an update with only the verdict set.
    #[must_use]
    pub fn new(status: SessionStatus) -> Self {
        Self {
            status,
            name: None,
            reason: None,
        }
    }
}

// ============================================================================
// StatusApi Trait
// ============================================================================

/// Session-status sink.
///
/// Seam between the lifecycle reporter and the vendor REST API, so the
/// reporter's swallowing behavior is testable without a network.
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// Records a status update for one session.
    async fn update_status(
        &self,
        session: &SessionId,
        app_automate: bool,
        update: &StatusUpdate,
    ) -> Result<()>;
}

// ============================================================================
// VendorConfig
// ============================================================================

/// Configuration for [`VendorApi`].
#[derive(Clone)]
pub struct VendorConfig {
    user: String,
    key: String,
    automate_base: String,
    app_automate_base: String,
}

impl VendorConfig {
    /// Creates a configuration with the standard API bases.
    #[must_use]
    pub fn new(user: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            key: key.into(),
            automate_base: AUTOMATE_API_BASE.to_string(),
            app_automate_base: APP_AUTOMATE_API_BASE.to_string(),
        }
    }

    /// Overrides both API bases; used against self-hosted mirrors.
    #[must_use]
    pub fn with_bases(
        mut self,
        automate: impl Into<String>,
        app_automate: impl Into<String>,
    ) -> Self {
        self.automate_base = automate.into();
        self.app_automate_base = app_automate.into();
        self
    }

    fn base(&self, app_automate: bool) -> &str {
        if app_automate {
            &self.app_automate_base
        } else {
            &self.automate_base
        }
    }

    fn session_endpoint(&self, session: &SessionId, app_automate: bool) -> String {
        format!(
            "{}/sessions/{}.json",
            self.base(app_automate).trim_end_matches('/'),
            urlencoding::encode(session.as_str())
        )
    }
}

impl fmt::Debug for VendorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorConfig")
            .field("user", &self.user)
            .field("key", &"<redacted>")
            .field("automate_base", &self.automate_base)
            .field("app_automate_base", &self.app_automate_base)
            .finish()
    }
}

// ============================================================================
// VendorApi
// ============================================================================

/// REST client for the vendor session API.
///
/// Requests are never retried automatically: a blindly retried PUT
/// risks double-reporting the status.
#[derive(Debug)]
pub struct VendorApi {
    http: reqwest::Client,
    config: VendorConfig,
}

impl VendorApi {
    /// Creates an API client.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(config: VendorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(VENDOR_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build vendor HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Retrieves the public (shareable) URL of a session.
    pub async fn public_url(&self, session: &SessionId, app_automate: bool) -> Result<String> {
        let endpoint = self.config.session_endpoint(session, app_automate);
        debug!(%endpoint, "Fetching public session URL");

        let response = self
            .http
            .get(&endpoint)
            .basic_auth(&self.config.user, Some(&self.config.key))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: Value = response.json().await?;

        body.get("automation_session")
            .and_then(|s| s.get("public_url"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::protocol(
                    "malformed vendor response",
                    "no automation_session.public_url field",
                    status,
                    body.to_string(),
                )
            })
    }
}

#[async_trait]
impl StatusApi for VendorApi {
    async fn update_status(
        &self,
        session: &SessionId,
        app_automate: bool,
        update: &StatusUpdate,
    ) -> Result<()> {
        let endpoint = self.config.session_endpoint(session, app_automate);
        debug!(%endpoint, status = ?update.status, "Updating session status");

        let response = self
            .http
            .put(&endpoint)
            .basic_auth(&self.config.user, Some(&self.config.key))
            .json(update)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::protocol(
                "vendor status update rejected",
                format!("PUT {endpoint}"),
                status.as_u16(),
                body,
            ));
        }

        Ok(())
    }
}

// ============================================================================
// ReporterConfig
// ============================================================================

/// Session naming rules for the lifecycle reporter.
///
/// Precedence when both are set: omitting the test title wins, the
/// session is named after the suite alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Prefix the session name with the suite title.
    pub prefix_suite_title: bool,
    /// Name the session after the suite only.
    pub omit_test_title: bool,
}

impl ReporterConfig {
    fn session_name(&self, suite: &str, test: &str) -> Option<String> {
        match (self.omit_test_title, self.prefix_suite_title) {
            (true, _) if !suite.is_empty() => Some(suite.to_string()),
            (true, _) => None,
            (false, true) if !suite.is_empty() => Some(format!("{suite} - {test}")),
            (false, _) if !test.is_empty() => Some(test.to_string()),
            _ => None,
        }
    }
}

// ============================================================================
// StatusReporter
// ============================================================================

#[derive(Debug, Default)]
struct ReporterState {
    suite_title: String,
    test_title: String,
    failures: u32,
    first_failure: Option<String>,
}

/// Drives the vendor status API from test lifecycle hooks.
///
/// Hooks never fail the caller: every vendor error is logged at warn
/// level and dropped.
pub struct StatusReporter {
    api: Arc<dyn StatusApi>,
    config: ReporterConfig,
    state: Mutex<ReporterState>,
}

impl StatusReporter {
    /// Creates a reporter over a status sink.
    #[must_use]
    pub fn new(api: Arc<dyn StatusApi>, config: ReporterConfig) -> Self {
        Self {
            api,
            config,
            state: Mutex::new(ReporterState::default()),
        }
    }

    /// Records the suite about to run.
    pub fn before_suite(&self, suite_title: &str) {
        let mut state = self.state.lock();
        state.suite_title = suite_title.to_string();
    }

    /// Records the test about to run.
    pub fn before_test(&self, test_title: &str) {
        let mut state = self.state.lock();
        state.test_title = test_title.to_string();
    }

    /// Records a test verdict.
    pub fn after_test(&self, passed: bool, reason: Option<&str>) {
        if passed {
            return;
        }
        let mut state = self.state.lock();
        state.failures += 1;
        if state.first_failure.is_none() {
            state.first_failure = reason.map(str::to_string).or_else(|| {
                let title = &state.test_title;
                (!title.is_empty()).then(|| format!("test failed: {title}"))
            });
        }
    }

    /// Reports the final verdict for every session behind the handle.
    ///
    /// Multiremote reports each child session individually. Vendor
    /// errors are swallowed into logs.
    pub async fn after_all(&self, session: Session<'_>) {
        let (update, suite) = {
            let state = self.state.lock();
            let status = if state.failures == 0 {
                SessionStatus::Passed
            } else {
                SessionStatus::Failed
            };
            let update = StatusUpdate {
                status,
                name: self.config.session_name(&state.suite_title, &state.test_title),
                reason: state.first_failure.clone(),
            };
            (update, state.suite_title.clone())
        };

        for (name, info) in session.instances() {
            let outcome = self
                .api
                .update_status(&info.id, info.is_app_automate(), &update)
                .await;

            if let Err(error) = outcome {
                warn!(
                    browser = %name,
                    session = %info.id,
                    suite = %suite,
                    %error,
                    "Vendor status update failed, ignoring"
                );
            }
        }
    }
}

impl fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
