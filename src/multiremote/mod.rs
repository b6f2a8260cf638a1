//! Multiremote fan-out.
//!
//! A [`Multiremote`] drives several remote sessions through one logical
//! handle. Handshakes run sequentially in declaration order and roll
//! back on partial failure; command fan-out runs concurrently and joins
//! on all children, so a slow or failing child never leaves a sibling's
//! request in flight unobserved.
//!
//! # Example
//!
//! ```ignore
//! use webdriver_client::{Capabilities, Multiremote};
//!
//! let remote = Multiremote::builder("http://localhost:4444")
//!     .browser("chrome", Capabilities::chrome())
//!     .browser("firefox", Capabilities::firefox())
//!     .connect()
//!     .await?;
//!
//! remote.dispatch("navigateTo", params).await?;
//! remote.delete_sessions().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::session::{self, Capabilities, Session, SessionInfo};
use crate::transport::{HttpTransport, Timeouts, Transport, TransportConfig};

// ============================================================================
// Multiremote
// ============================================================================

/// Handle driving several sessions as one.
///
/// Children keep declaration order; results come back keyed by browser
/// name in that same order.
#[derive(Debug)]
pub struct Multiremote {
    instances: Vec<(String, Client)>,
}

impl Multiremote {
    /// Starts building a multiremote handle for the given remote end URL.
    #[must_use]
    pub fn builder(server_url: impl Into<String>) -> MultiremoteBuilder {
        MultiremoteBuilder::new(server_url)
    }

    /// Assembles a handle from already-connected clients.
    pub(crate) fn from_instances(instances: Vec<(String, Client)>) -> Self {
        Self { instances }
    }

    /// Returns the child client for a browser name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Client> {
        self.instances
            .iter()
            .find(|(instance, _)| instance == name)
            .map(|(_, client)| client)
    }

    /// Returns the browser names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.instances.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Iterates over `(name, client)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Client)> {
        self.instances
            .iter()
            .map(|(name, client)| (name.as_str(), client))
    }

    /// Returns the number of child sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if no children are attached.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Returns the session view for lifecycle consumers.
    #[must_use]
    pub fn session(&self) -> Session<'_> {
        Session::Multi(
            self.instances
                .iter()
                .map(|(name, client)| (name.as_str(), client.session_info()))
                .collect(),
        )
    }
}

// ============================================================================
// Fan-out
// ============================================================================

impl Multiremote {
    /// Fans one command out to every child concurrently.
    ///
    /// All children are awaited before anything is returned; if any
    /// child failed, the first error in declaration order surfaces and
    /// the partial results are dropped.
    pub async fn dispatch(
        &self,
        command: &str,
        params: Map<String, Value>,
    ) -> Result<Vec<(String, Value)>> {
        let outcomes = self.dispatch_tolerant(command, params).await;
        collect_strict(outcomes)
    }

    /// Fans one command out, keeping per-child outcomes.
    ///
    /// Nothing is cancelled and no error short-circuits; the caller
    /// inspects each child's result.
    pub async fn dispatch_tolerant(
        &self,
        command: &str,
        params: Map<String, Value>,
    ) -> Vec<(String, Result<Value>)> {
        self.dispatch_filtered(command, params, |_, _| true).await
    }

    /// Fans one command out to the children a predicate selects.
    ///
    /// The predicate sees the browser name and the negotiated session
    /// state, so selection can key off vendor capability presence.
    pub async fn dispatch_filtered<P>(
        &self,
        command: &str,
        params: Map<String, Value>,
        select: P,
    ) -> Vec<(String, Result<Value>)>
    where
        P: Fn(&str, &SessionInfo) -> bool,
    {
        let selected: Vec<_> = self
            .instances
            .iter()
            .filter(|(name, client)| select(name, client.session_info()))
            .collect();

        debug!(command, children = selected.len(), "Fanning out command");

        let calls = selected.iter().map(|(name, client)| {
            let params = params.clone();
            async move { (name.clone(), client.dispatch(command, params).await) }
        });

        join_all(calls).await
    }

    /// Deletes every child session.
    ///
    /// All deletes run concurrently and are awaited; the first error in
    /// declaration order surfaces after all have settled. Each child
    /// delete is itself idempotent.
    pub async fn delete_sessions(&self) -> Result<()> {
        let deletes = self.instances.iter().map(|(name, client)| async move {
            (name.clone(), client.delete_session().await)
        });

        for (name, outcome) in join_all(deletes).await {
            outcome.map_err(|error| {
                warn!(browser = %name, %error, "Child session delete failed");
                error
            })?;
        }

        Ok(())
    }
}

/// Folds tolerant outcomes into all-or-nothing results.
fn collect_strict(outcomes: Vec<(String, Result<Value>)>) -> Result<Vec<(String, Value)>> {
    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_error = None;

    for (name, outcome) in outcomes {
        match outcome {
            Ok(value) => results.push((name, value)),
            Err(error) => {
                warn!(browser = %name, %error, "Child dispatch failed");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(results),
    }
}

// ============================================================================
// MultiremoteBuilder
// ============================================================================

/// Builder for [`Multiremote`].
#[derive(Debug)]
pub struct MultiremoteBuilder {
    server_url: String,
    basic_auth: Option<(String, String)>,
    timeouts: Timeouts,
    entries: Vec<(String, Capabilities)>,
}

impl MultiremoteBuilder {
    /// Creates a builder for the given remote end URL.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            basic_auth: None,
            timeouts: Timeouts::default(),
            entries: Vec::new(),
        }
    }

    /// Sets basic-auth credentials for the remote end.
    #[must_use]
    pub fn basic_auth(mut self, user: impl Into<String>, secret: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), secret.into()));
        self
    }

    /// Overrides the per-class transport deadlines.
    #[must_use]
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Adds a browser entry; declaration order is kept throughout.
    #[must_use]
    pub fn browser(mut self, name: impl Into<String>, capabilities: Capabilities) -> Self {
        self.entries.push((name.into(), capabilities));
        self
    }

    /// Connects every browser entry.
    ///
    /// Handshakes run sequentially in declaration order. If any child
    /// handshake fails, every session created so far is torn down
    /// (best-effort) before the aggregate error is raised, so no live
    /// remote session is leaked.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an invalid URL or no browser entries;
    /// [`Error::SessionCreation`] naming the failed entry.
    pub async fn connect(self) -> Result<Multiremote> {
        if self.entries.is_empty() {
            return Err(Error::config("multiremote needs at least one browser entry"));
        }

        let mut config = TransportConfig::new(&self.server_url)?.with_timeouts(self.timeouts);
        if let Some((user, secret)) = self.basic_auth {
            config = config.with_basic_auth(user, secret);
        }
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);

        connect_all(transport, self.timeouts, self.entries).await
    }
}

/// Runs the sequential handshakes with best-effort rollback.
pub(crate) async fn connect_all(
    transport: Arc<dyn Transport>,
    timeouts: Timeouts,
    entries: Vec<(String, Capabilities)>,
) -> Result<Multiremote> {
    let mut instances: Vec<(String, Client)> = Vec::with_capacity(entries.len());

    for (name, capabilities) in entries {
        match session::handshake(transport.as_ref(), &timeouts, &capabilities).await {
            Ok(info) => {
                debug!(browser = %name, session = %info.id, "Child session created");
                let client = Client::from_parts(Arc::clone(&transport), timeouts, info);
                instances.push((name, client));
            }
            Err(error) => {
                for (created, client) in &instances {
                    if let Err(teardown_error) = session::teardown(
                        transport.as_ref(),
                        &timeouts,
                        client.session_id(),
                    )
                    .await
                    {
                        warn!(
                            browser = %created,
                            error = %teardown_error,
                            "Rollback teardown failed"
                        );
                    }
                }
                return Err(Error::session_creation(format!(
                    "handshake for '{name}' failed: {error}"
                )));
            }
        }
    }

    Ok(Multiremote::from_instances(instances))
}

// ============================================================================
// Tests
// ============================================================================
