//! HTTP transport layer.
//!
//! This module carries requests between the command dispatcher and a
//! WebDriver-compliant remote end over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                          ┌─────────────────┐
//! │  Client (Rust)   │                          │  Remote end     │
//! │                  │       HTTP + JSON        │  (WebDriver     │
//! │  dispatch()      │◄────────────────────────►│   server)       │
//! │  → Transport     │   /session/:sessionId/…  │                 │
//! └──────────────────┘                          └─────────────────┘
//! ```
//!
//! The [`Transport`] trait is the seam between protocol logic and I/O:
//! production code uses [`HttpTransport`] (reqwest), tests inject an
//! in-process fake. Suspension happens only here — registry and
//! dispatcher logic never hold a lock across the network exchange.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | reqwest-backed transport with retry and auth |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::protocol::{HttpMethod, TimeoutClass, WireReply};

// ============================================================================
// Submodules
// ============================================================================

/// reqwest-backed HTTP transport.
pub mod http;

#[cfg(test)]
pub(crate) mod fake;

// ============================================================================
// Re-exports
// ============================================================================

pub use http::{HttpTransport, TransportConfig};

// ============================================================================
// Transport Trait
// ============================================================================

/// Low-level request/response exchange against the remote end.
///
/// Implementations own the wire; they do not interpret the WebDriver
/// envelope, which stays with the dispatcher so raw bodies remain
/// available for diagnostics.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends one request and returns the raw reply.
    ///
    /// `path` is an already-filled endpoint path (no placeholders).
    /// `deadline` bounds the whole exchange; exceeding it surfaces
    /// [`crate::Error::Timeout`] without cancelling the remote-side
    /// operation.
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        deadline: Duration,
    ) -> Result<WireReply>;
}

// ============================================================================
// Timeouts
// ============================================================================

/// Per-class transport deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Session-level calls (handshake, teardown).
    pub session: Duration,
    /// Regular commands.
    pub command: Duration,
    /// Polling calls (server status).
    pub poll: Duration,
}

impl Timeouts {
    /// Returns the deadline for a command's timeout class.
    #[inline]
    #[must_use]
    pub fn for_class(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::Session => self.session,
            TimeoutClass::Command => self.command,
            TimeoutClass::Poll => self.poll,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            session: Duration::from_secs(90),
            command: Duration::from_secs(30),
            poll: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.session.as_secs(), 90);
        assert_eq!(timeouts.command.as_secs(), 30);
        assert_eq!(timeouts.poll.as_secs(), 10);
    }

    #[test]
    fn test_for_class() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.for_class(TimeoutClass::Session), timeouts.session);
        assert_eq!(timeouts.for_class(TimeoutClass::Command), timeouts.command);
        assert_eq!(timeouts.for_class(TimeoutClass::Poll), timeouts.poll);
    }
}
