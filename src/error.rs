//! Error types for the WebDriver client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webdriver_client::{Result, By};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     let element = client.find_element(By::css("#submit")).await?;
//!     element.click().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Local pre-flight | [`Error::InvalidArgument`], [`Error::UnknownCommand`] |
//! | Protocol | [`Error::Protocol`], [`Error::SessionCreation`] |
//! | Element | [`Error::NoSuchElement`], [`Error::StaleElement`] |
//! | Execution | [`Error::Timeout`] |
//! | External | [`Error::Http`], [`Error::Json`] |
//!
//! Local errors ([`Error::InvalidArgument`], [`Error::UnknownCommand`]) fail
//! fast and never reach the wire. [`Error::StaleElement`] is recoverable by
//! re-running the original element query.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::ElementId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Local Pre-flight Errors
    // ========================================================================
    /// Invalid argument in command params.
    ///
    /// Raised before the request is built; never sent over the wire.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Command name not present in the command registry.
    #[error("Unknown command: {command}")]
    UnknownCommand {
        /// The unrecognized command name.
        command: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Non-conforming or error-status protocol response.
    ///
    /// Carries the remote error code, HTTP status, and the raw response
    /// body for diagnostics.
    #[error("Protocol error ({error}): {message}")]
    Protocol {
        /// WebDriver error code (e.g. "invalid selector"), or a synthetic
        /// code for malformed envelopes.
        error: String,
        /// Human-readable error message.
        message: String,
        /// HTTP status of the response.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// New-session handshake failure.
    ///
    /// Fatal for the requesting handle; aggregate-fatal for multiremote.
    #[error("Session creation failed: {message}")]
    SessionCreation {
        /// Description of the handshake failure.
        message: String,
    },

    // ========================================================================
    // Element Errors
    // ========================================================================
    /// No element matched the locator.
    #[error("Element not found: {locator}")]
    NoSuchElement {
        /// Locator that matched nothing.
        locator: String,
    },

    /// Element reference is no longer valid.
    ///
    /// Recoverable by re-running the original locator query.
    #[error("Stale element: {element_id}")]
    StaleElement {
        /// The stale element's server-assigned ID.
        element_id: ElementId,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Transport-level deadline exceeded.
    ///
    /// The remote operation may still complete server-side.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an unknown command error.
    #[inline]
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(
        error: impl Into<String>,
        message: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Protocol {
            error: error.into(),
            message: message.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a session creation error.
    #[inline]
    pub fn session_creation(message: impl Into<String>) -> Self {
        Self::SessionCreation {
            message: message.into(),
        }
    }

    /// Creates a no-such-element error.
    #[inline]
    pub fn no_such_element(locator: impl Into<String>) -> Self {
        Self::NoSuchElement {
            locator: locator.into(),
        }
    }

    /// Creates a stale element error.
    #[inline]
    pub fn stale_element(element_id: ElementId) -> Self {
        Self::StaleElement { element_id }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is an element error.
    #[inline]
    #[must_use]
    pub fn is_element_error(&self) -> bool {
        matches!(self, Self::NoSuchElement { .. } | Self::StaleElement { .. })
    }

    /// Returns `true` if this error never reached the wire.
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidArgument { .. } | Self::UnknownCommand { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry; a stale element succeeds
    /// after re-running its original locator query.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::StaleElement { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_argument("missing required parameter: url");
        assert_eq!(
            err.to_string(),
            "Invalid argument: missing required parameter: url"
        );
    }

    #[test]
    fn test_protocol_error_carries_raw_body() {
        let err = Error::protocol("invalid selector", "bad css", 400, r#"{"value":null}"#);
        match err {
            Error::Protocol { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body, r#"{"value":null}"#);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::timeout("POST /session/abc/url", 30_000);
        let other_err = Error::config("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_element_error() {
        let not_found = Error::no_such_element("css selector=#missing");
        let stale = Error::stale_element(ElementId::new("abc"));
        let other = Error::unknown_command("teleport");

        assert!(not_found.is_element_error());
        assert!(stale.is_element_error());
        assert!(!other.is_element_error());
    }

    #[test]
    fn test_is_local() {
        assert!(Error::invalid_argument("x").is_local());
        assert!(Error::unknown_command("x").is_local());
        assert!(!Error::session_creation("x").is_local());
    }

    #[test]
    fn test_is_recoverable() {
        let stale = Error::stale_element(ElementId::new("abc"));
        let config_err = Error::config("test");

        assert!(stale.is_recoverable());
        assert!(!config_err.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
