//! Session identity and lifecycle.
//!
//! A session is the server-side handle to one remote browser instance,
//! created by the new-session handshake and destroyed by an explicit
//! delete. Multiremote is modeled as an explicit tagged variant
//! ([`Session::Multi`]) rather than a capability probe, so dispatch
//! logic switches on the tag.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `capabilities` | Capability sets and handshake payloads |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{self, CommandRegistry, WireReply};
use crate::transport::{Timeouts, Transport};

// ============================================================================
// Submodules
// ============================================================================

/// Capability sets and handshake payloads.
pub mod capabilities;

pub use capabilities::Capabilities;

// ============================================================================
// SessionInfo
// ============================================================================

/// State of one negotiated session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Server-assigned session ID.
    pub id: SessionId,
    /// Capabilities negotiated by the remote end.
    pub capabilities: Value,
    /// Capabilities originally requested.
    pub requested: Capabilities,
}

impl SessionInfo {
    /// Returns `true` if a mobile-app capability key is present on
    /// either the requested or the negotiated capabilities.
    ///
    /// Selects the vendor app-automate base path only; not part of the
    /// WebDriver protocol.
    #[must_use]
    pub fn is_app_automate(&self) -> bool {
        if self.requested.is_app_automate() {
            return true;
        }

        self.capabilities.as_object().is_some_and(|negotiated| {
            capabilities::APP_CAPABILITY_KEYS
                .iter()
                .any(|key| negotiated.contains_key(*key))
        })
    }
}

// ============================================================================
// Session
// ============================================================================

/// Tagged view of what a handle is attached to.
///
/// Borrowed from a [`crate::Client`] or [`crate::Multiremote`]; consumers
/// (e.g. the vendor status reporter) switch on the tag instead of
/// probing capabilities.
#[derive(Debug, Clone)]
pub enum Session<'a> {
    /// One remote browser instance.
    Single(&'a SessionInfo),
    /// Many instances, keyed by browser name in declaration order.
    Multi(Vec<(&'a str, &'a SessionInfo)>),
}

impl<'a> Session<'a> {
    /// Returns `true` for the multiremote variant.
    #[inline]
    #[must_use]
    pub fn is_multiremote(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// Iterates over `(name, info)` pairs in declaration order.
    ///
    /// The single variant yields one pair with an empty name.
    pub fn instances(&self) -> Vec<(&'a str, &'a SessionInfo)> {
        match self {
            Self::Single(info) => vec![("", info)],
            Self::Multi(instances) => instances.clone(),
        }
    }

    /// Returns all session IDs in declaration order.
    #[must_use]
    pub fn ids(&self) -> Vec<&'a SessionId> {
        self.instances().into_iter().map(|(_, info)| &info.id).collect()
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Performs the new-session handshake.
///
/// # Errors
///
/// [`Error::SessionCreation`] if the remote end rejects the
/// capabilities or returns malformed output. Transport-level timeouts
/// surface as [`Error::Timeout`].
pub(crate) async fn handshake(
    transport: &dyn Transport,
    timeouts: &Timeouts,
    requested: &Capabilities,
) -> Result<SessionInfo> {
    let descriptor = CommandRegistry::global().get("newSession")?;

    debug!(capabilities = %serde_json::to_string(requested)?, "Creating session");

    let reply = transport
        .send(
            descriptor.method,
            descriptor.url_template,
            Some(requested.new_session_payload()),
            timeouts.for_class(descriptor.timeout_class),
        )
        .await?;

    let value = unwrap_handshake(reply)?;

    let session_id = value
        .get("sessionId")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::session_creation("handshake response has no sessionId"))?;
    let capabilities = value
        .get("capabilities")
        .cloned()
        .ok_or_else(|| Error::session_creation("handshake response has no capabilities"))?;

    let info = SessionInfo {
        id: SessionId::new(session_id),
        capabilities,
        requested: requested.clone(),
    };

    debug!(session_id = %info.id, "Session created");

    Ok(info)
}

/// Unwraps the handshake envelope, folding protocol failures into
/// [`Error::SessionCreation`].
fn unwrap_handshake(reply: WireReply) -> Result<Value> {
    protocol::unwrap_envelope(reply).map_err(|error| match error {
        Error::SessionCreation { .. } | Error::Timeout { .. } => error,
        Error::Protocol { error, message, .. } => {
            Error::session_creation(format!("{error}: {message}"))
        }
        other => Error::session_creation(other.to_string()),
    })
}

// ============================================================================
// Teardown
// ============================================================================

/// Deletes a session, logging (not propagating) remote-side refusals.
///
/// Used for best-effort rollback when a multiremote handshake partially
/// fails, so no live remote session is leaked.
pub(crate) async fn teardown(
    transport: &dyn Transport,
    timeouts: &Timeouts,
    id: &SessionId,
) -> Result<()> {
    let descriptor = CommandRegistry::global().get("deleteSession")?;

    let path = protocol::fill_template(descriptor.url_template, |name| match name {
        "sessionId" => Some(id.as_str().to_string()),
        _ => None,
    })?;

    let reply = transport
        .send(
            descriptor.method,
            &path,
            None,
            timeouts.for_class(descriptor.timeout_class),
        )
        .await?;

    if let Err(error) = protocol::unwrap_envelope(reply) {
        warn!(session_id = %id, %error, "Delete session reported an error");
    }

    debug!(session_id = %id, "Session deleted");

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
