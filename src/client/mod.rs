//! Client handle and command dispatcher.
//!
//! A [`Client`] owns one remote session: it resolves logical command
//! names through the static command registry, fills URL placeholders
//! from the session and element registries, exchanges the request over
//! the transport, and validates the response envelope. Element-producing
//! commands register their results before returning.
//!
//! # Example
//!
//! ```ignore
//! use webdriver_client::{By, Capabilities, Client};
//!
//! let client = Client::builder("http://localhost:4444")
//!     .capabilities(Capabilities::chrome())
//!     .connect()
//!     .await?;
//!
//! client.goto("https://example.com").await?;
//! let button = client.find_element(By::css("#submit")).await?;
//! button.click().await?;
//! client.delete_session().await?;
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `commands` | Typed wrappers over the W3C command table |
//! | `element` | Element handles with stale re-find |
//! | `wait` | Polling helpers for element collections |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::element::{By, ElementHandle, ElementRegistry};
use crate::error::{Error, Result};
use crate::identifiers::{ElementId, SessionId};
use crate::protocol::{self, CommandDescriptor, CommandRegistry, ElementYield, HttpMethod};
use crate::session::{self, Capabilities, Session, SessionInfo};
use crate::transport::{HttpTransport, Timeouts, Transport, TransportConfig};

// ============================================================================
// Submodules
// ============================================================================

/// Typed wrappers over the W3C command table.
pub mod commands;

/// Element handles with stale re-find.
pub mod element;

/// Polling helpers for element collections.
pub mod wait;

pub use commands::{Cookie, Frame, Rect, ServerStatus, SessionTimeouts};
pub use element::Element;
pub use wait::WaitOptions;

// ============================================================================
// ClientInner
// ============================================================================

/// Shared state behind a [`Client`].
#[derive(Debug)]
struct ClientInner {
    transport: Arc<dyn Transport>,
    timeouts: Timeouts,
    session: SessionInfo,
    /// Set once by the first delete; later deletes are local no-ops.
    deleted: AtomicBool,
    elements: ElementRegistry,
}

// ============================================================================
// Client
// ============================================================================

/// Handle to one remote browser session.
///
/// Cheap to clone; clones share the session, the element registry, and
/// the transport connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Starts building a client for the given remote end URL.
    #[must_use]
    pub fn builder(server_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(server_url)
    }

    /// Assembles a client around an already-negotiated session.
    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        timeouts: Timeouts,
        session: SessionInfo,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                timeouts,
                session,
                deleted: AtomicBool::new(false),
                elements: ElementRegistry::new(),
            }),
        }
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.inner.session.id
    }

    /// Returns the negotiated session state.
    #[inline]
    #[must_use]
    pub fn session_info(&self) -> &SessionInfo {
        &self.inner.session
    }

    /// Returns the session view for lifecycle consumers.
    #[inline]
    #[must_use]
    pub fn session(&self) -> Session<'_> {
        Session::Single(&self.inner.session)
    }

    /// Returns the capabilities negotiated by the remote end.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Value {
        &self.inner.session.capabilities
    }

    /// Returns `true` once the session has been deleted.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn elements(&self) -> &ElementRegistry {
        &self.inner.elements
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub(crate) fn timeouts(&self) -> &Timeouts {
        &self.inner.timeouts
    }
}

// ============================================================================
// Dispatch
// ============================================================================

impl Client {
    /// Dispatches a logical command.
    ///
    /// Resolves the command descriptor, validates `params` against the
    /// declared required set, fills URL placeholders, exchanges the
    /// request, and unwraps the response envelope. Element-producing
    /// commands have their results registered before the value is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownCommand`] for a name not in the table.
    /// - [`Error::InvalidArgument`] for missing required parameters, an
    ///   unregistered element handle, or a deleted session; these never
    ///   reach the wire.
    /// - The mapped protocol error for error envelopes.
    #[instrument(skip(self, params), fields(session = %self.session_id()))]
    pub async fn dispatch(&self, command: &str, params: Map<String, Value>) -> Result<Value> {
        let descriptor = CommandRegistry::global().get(command)?;
        self.dispatch_descriptor(descriptor, params).await
    }

    async fn dispatch_descriptor(
        &self,
        descriptor: &'static CommandDescriptor,
        mut params: Map<String, Value>,
    ) -> Result<Value> {
        if descriptor.is_session_scoped() && self.is_deleted() {
            return Err(Error::invalid_argument(format!(
                "session {} is deleted",
                self.session_id()
            )));
        }

        for required in descriptor.required {
            if !params.contains_key(*required) {
                return Err(Error::invalid_argument(format!(
                    "{}: missing required parameter: {required}",
                    descriptor.name
                )));
            }
        }

        // Locator and parent are captured before the body is built so
        // element-producing results can be registered afterwards.
        let (path, parent) = self.fill_path(descriptor, &mut params)?;
        let locator = locator_from_params(&params);

        let body = match descriptor.method {
            HttpMethod::Post | HttpMethod::Put => Some(Value::Object(params)),
            HttpMethod::Get | HttpMethod::Delete => None,
        };

        let reply = self
            .inner
            .transport
            .send(
                descriptor.method,
                &path,
                body,
                self.inner.timeouts.for_class(descriptor.timeout_class),
            )
            .await?;

        let value = protocol::unwrap_envelope(reply)?;

        self.register_yield(descriptor, &value, locator, parent);

        debug!(command = descriptor.name, "Command completed");

        Ok(value)
    }

    /// Fills the descriptor's URL template.
    ///
    /// `sessionId` comes from the active session, `elementId` resolves
    /// through the element registry, every other placeholder is consumed
    /// from `params` (removed so it is not duplicated into the body).
    ///
    /// Also returns the resolved element id, captured before the path is
    /// percent-encoded, for element-relative result registration.
    fn fill_path(
        &self,
        descriptor: &CommandDescriptor,
        params: &mut Map<String, Value>,
    ) -> Result<(String, Option<ElementId>)> {
        let mut resolve_error = None;
        let mut element = None;

        let path = protocol::fill_template(descriptor.url_template, |name| match name {
            "sessionId" => Some(self.session_id().as_str().to_string()),
            "elementId" => {
                let id = params
                    .remove("elementId")
                    .and_then(|v| v.as_str().map(ElementId::new))?;
                match self.inner.elements.resolve(&id) {
                    Ok(resolved) => {
                        element = Some(id);
                        Some(resolved)
                    }
                    Err(error) => {
                        resolve_error = Some(error);
                        None
                    }
                }
            }
            other => params.remove(other).and_then(|v| match v {
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            }),
        });

        match resolve_error {
            Some(error) => Err(error),
            None => Ok((path?, element)),
        }
    }

    /// Registers element references carried by a response value.
    fn register_yield(
        &self,
        descriptor: &CommandDescriptor,
        value: &Value,
        locator: Option<By>,
        parent: Option<ElementId>,
    ) {
        let make_handle = |id: ElementId| ElementHandle {
            id,
            session: self.session_id().clone(),
            locator: locator.clone(),
            parent: parent.clone(),
        };

        match descriptor.element_yield {
            ElementYield::None => {}
            ElementYield::Single => {
                if let Some(id) = protocol::extract_element_id(value) {
                    self.inner.elements.register(make_handle(id));
                }
            }
            ElementYield::Many => {
                for id in protocol::extract_element_ids(value) {
                    self.inner.elements.register(make_handle(id));
                }
            }
        }
    }
}

/// Rebuilds the locator from find-command params, if present.
fn locator_from_params(params: &Map<String, Value>) -> Option<By> {
    let using = params.get("using")?.as_str()?;
    let value = params.get("value")?.as_str()?;
    By::from_using(using, value)
}

// ============================================================================
// Session Lifecycle
// ============================================================================

impl Client {
    /// Deletes the remote session.
    ///
    /// Idempotent: the first call issues the delete command, later calls
    /// return without touching the wire.
    pub async fn delete_session(&self) -> Result<()> {
        if self.inner.deleted.swap(true, Ordering::AcqRel) {
            debug!(session = %self.session_id(), "Session already deleted");
            return Ok(());
        }

        session::teardown(
            self.inner.transport.as_ref(),
            &self.inner.timeouts,
            self.session_id(),
        )
        .await
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    server_url: String,
    basic_auth: Option<(String, String)>,
    capabilities: Capabilities,
    timeouts: Timeouts,
}

impl ClientBuilder {
    /// Creates a builder for the given remote end URL.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            basic_auth: None,
            capabilities: Capabilities::new(),
            timeouts: Timeouts::default(),
        }
    }

    /// Sets basic-auth credentials for the remote end.
    #[must_use]
    pub fn basic_auth(mut self, user: impl Into<String>, secret: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), secret.into()));
        self
    }

    /// Sets the requested capabilities.
    #[must_use]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Overrides the per-class transport deadlines.
    #[must_use]
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Connects to the remote end and performs the new-session handshake.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an invalid URL, [`Error::SessionCreation`]
    /// if the handshake is rejected.
    pub async fn connect(self) -> Result<Client> {
        let mut config = TransportConfig::new(&self.server_url)?.with_timeouts(self.timeouts);
        if let Some((user, secret)) = self.basic_auth {
            config = config.with_basic_auth(user, secret);
        }

        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
        let session =
            session::handshake(transport.as_ref(), &self.timeouts, &self.capabilities).await?;

        Ok(Client::from_parts(transport, self.timeouts, session))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::{WEB_ELEMENT_KEY, WireReply};
    use crate::transport::fake::FakeTransport;

    /// Builds a client over a fake transport with a fixed session.
    pub(crate) fn fake_client() -> (Client, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::new());
        let session = SessionInfo {
            id: SessionId::new("sess-1"),
            capabilities: json!({ "browserName": "chrome" }),
            requested: Capabilities::chrome(),
        };
        let client = Client::from_parts(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Timeouts::default(),
            session,
        );
        (client, transport)
    }

    pub(crate) fn params(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_dispatch_fills_session_placeholder() {
        let (client, transport) = fake_client();
        transport.reply_value(json!("https://example.com/"));

        let value = client
            .dispatch("getUrl", Map::new())
            .await
            .expect("dispatch succeeds");

        assert_eq!(value, json!("https://example.com/"));
        assert_eq!(transport.calls()[0].path, "/session/sess-1/url");
        assert_eq!(transport.calls()[0].method, HttpMethod::Get);
        assert!(transport.calls()[0].body.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_missing_required_parameter_is_local() {
        let (client, transport) = fake_client();

        let err = client.dispatch("navigateTo", Map::new()).await.unwrap_err();

        assert!(err.is_local());
        assert_eq!(transport.call_count(), 0, "request never reached the wire");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let (client, _transport) = fake_client();
        let err = client.dispatch("teleport", Map::new()).await.unwrap_err();
        assert!(matches!(err, Error::UnknownCommand { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_consumes_path_params_from_body() {
        let (client, transport) = fake_client();
        transport.reply_value(json!(null));

        client
            .dispatch("deleteCookie", params(&[("name", json!("token"))]))
            .await
            .expect("dispatch succeeds");

        assert_eq!(transport.calls()[0].path, "/session/sess-1/cookie/token");
    }

    #[tokio::test]
    async fn test_find_element_registers_reference() {
        let (client, transport) = fake_client();
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-7" }));

        client
            .dispatch(
                "findElement",
                params(&[("using", json!("css selector")), ("value", json!("#foo"))]),
            )
            .await
            .expect("dispatch succeeds");

        let entry = client
            .elements()
            .get(&ElementId::new("node-7"))
            .expect("registered");
        assert_eq!(entry.locator, Some(By::css("#foo")));
        assert_eq!(entry.parent, None);
    }

    #[tokio::test]
    async fn test_find_elements_registers_each_reference() {
        let (client, transport) = fake_client();
        transport.reply_value(json!([
            { WEB_ELEMENT_KEY: "a" },
            { WEB_ELEMENT_KEY: "b" },
        ]));

        client
            .dispatch(
                "findElements",
                params(&[("using", json!("css selector")), ("value", json!(".item"))]),
            )
            .await
            .expect("dispatch succeeds");

        assert_eq!(client.elements().len(), 2);
    }

    #[tokio::test]
    async fn test_element_command_resolves_registered_id() {
        let (client, transport) = fake_client();
        client.elements().register(ElementHandle {
            id: ElementId::new("node-7"),
            session: SessionId::new("sess-1"),
            locator: Some(By::css("#foo")),
            parent: None,
        });
        transport.reply_value(json!(null));

        client
            .dispatch("elementClick", params(&[("elementId", json!("node-7"))]))
            .await
            .expect("dispatch succeeds");

        let call = &transport.calls()[0];
        assert_eq!(call.path, "/session/sess-1/element/node-7/click");
        assert_eq!(call.method, HttpMethod::Post);
        // elementId is a path parameter, not a body field.
        assert_eq!(call.body, Some(json!({})));
    }

    #[tokio::test]
    async fn test_element_command_with_unregistered_id_is_local() {
        let (client, transport) = fake_client();

        let err = client
            .dispatch("elementClick", params(&[("elementId", json!("ghost"))]))
            .await
            .unwrap_err();

        assert!(err.is_local());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_child_find_records_parent() {
        let (client, transport) = fake_client();
        client.elements().register(ElementHandle {
            id: ElementId::new("root"),
            session: SessionId::new("sess-1"),
            locator: Some(By::css("#root")),
            parent: None,
        });
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "child" }));

        client
            .dispatch(
                "findElementFromElement",
                params(&[
                    ("elementId", json!("root")),
                    ("using", json!("css selector")),
                    ("value", json!(".child")),
                ]),
            )
            .await
            .expect("dispatch succeeds");

        let entry = client
            .elements()
            .get(&ElementId::new("child"))
            .expect("registered");
        assert_eq!(entry.parent, Some(ElementId::new("root")));
        assert_eq!(entry.locator, Some(By::css(".child")));
    }

    #[tokio::test]
    async fn test_parent_with_reserved_characters_keeps_raw_id() {
        let (client, transport) = fake_client();
        client.elements().register(ElementHandle {
            id: ElementId::new("node 1/x"),
            session: SessionId::new("sess-1"),
            locator: Some(By::css("#root")),
            parent: None,
        });
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "child" }));

        client
            .dispatch(
                "findElementFromElement",
                params(&[
                    ("elementId", json!("node 1/x")),
                    ("using", json!("css selector")),
                    ("value", json!(".child")),
                ]),
            )
            .await
            .expect("dispatch succeeds");

        // The wire path is encoded, the recorded parent is not.
        assert_eq!(
            transport.calls()[0].path,
            "/session/sess-1/element/node%201%2Fx/element"
        );
        let entry = client
            .elements()
            .get(&ElementId::new("child"))
            .expect("registered");
        assert_eq!(entry.parent, Some(ElementId::new("node 1/x")));
        client
            .elements()
            .resolve(entry.parent.as_ref().expect("parent"))
            .expect("parent id resolves as registered");
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let (client, transport) = fake_client();
        transport.reply_failure(Error::timeout("GET /session/sess-1/url", 30_000));

        let err = client.dispatch("getUrl", Map::new()).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_envelope_body_is_protocol_error() {
        let (client, transport) = fake_client();
        transport.reply_raw(WireReply::new(200, json!({ "data": 42 })));

        let err = client.dispatch("getUrl", Map::new()).await.unwrap_err();

        match err {
            Error::Protocol { body, .. } => assert!(body.contains("42")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_session_is_idempotent() {
        let (client, transport) = fake_client();

        client.delete_session().await.expect("first delete");
        client.delete_session().await.expect("second delete");

        assert_eq!(transport.call_count(), 1, "exactly one network call");
        assert!(client.is_deleted());
    }

    #[tokio::test]
    async fn test_dispatch_after_delete_is_local_error() {
        let (client, transport) = fake_client();
        client.delete_session().await.expect("delete");

        let err = client.dispatch("getUrl", Map::new()).await.unwrap_err();

        assert!(err.is_local());
        assert_eq!(transport.call_count(), 1, "only the delete hit the wire");
    }

    #[tokio::test]
    async fn test_status_is_not_session_scoped() {
        let (client, transport) = fake_client();
        client.delete_session().await.expect("delete");
        transport.reply_value(json!({ "ready": true }));

        // Server status stays reachable after the session is gone.
        let value = client.dispatch("status", Map::new()).await.expect("status");
        assert_eq!(value["ready"], json!(true));
    }

    #[tokio::test]
    async fn test_chrome_find_click_scenario() {
        let transport = Arc::new(FakeTransport::new());
        transport.reply_value(json!({
            "sessionId": "sess-42",
            "capabilities": { "browserName": "chrome" },
        }));

        let session = session::handshake(
            transport.as_ref(),
            &Timeouts::default(),
            &Capabilities::chrome(),
        )
        .await
        .expect("handshake");
        let client = Client::from_parts(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Timeouts::default(),
            session,
        );

        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-1" }));
        let found = client
            .dispatch(
                "findElement",
                params(&[("using", json!("css selector")), ("value", json!("#foo"))]),
            )
            .await
            .expect("find");
        let id = protocol::extract_element_id(&found).expect("reference");

        transport.reply_value(json!(null));
        let clicked = client
            .dispatch("elementClick", params(&[("elementId", json!(id.as_str()))]))
            .await
            .expect("click");

        assert!(clicked.is_null());
        let calls = transport.calls();
        assert_eq!(calls[2].path, "/session/sess-42/element/node-1/click");
        assert_eq!(calls[2].method, HttpMethod::Post);
    }
}
