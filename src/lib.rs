//! WebDriver client - W3C protocol automation library.
//!
//! This library drives WebDriver-compliant remote ends (Selenium,
//! chromedriver, geckodriver, cloud grids) over HTTP, with first-class
//! multiremote fan-out and vendor session reporting.
//!
//! # Architecture
//!
//! The crate is layered leaf-first:
//!
//! - **Transport**: HTTP exchange with retry/timeout policy; the
//!   [`transport::Transport`] trait is the seam tests inject fakes at
//! - **Protocol**: static command table, envelope validation, element
//!   reference extraction
//! - **Client**: command dispatcher plus session and element registries
//! - **Actions / Multiremote / Vendor**: composition layers that sit on
//!   the dispatcher
//!
//! Key design principles:
//!
//! - Commands are data: one static [`protocol::CommandDescriptor`] table,
//!   validated at startup, no runtime reflection
//! - A request with an unresolved URL placeholder is never emitted
//! - Registry state updates only after the network exchange completes;
//!   no lock is held across a suspension point
//! - Stale element references are re-found with exactly the original
//!   selector, once
//!
//! # Quick Start
//!
//! ```no_run
//! use webdriver_client::{By, Capabilities, Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder("http://localhost:4444")
//!         .capabilities(Capabilities::chrome())
//!         .connect()
//!         .await?;
//!
//!     client.goto("https://example.com").await?;
//!     let heading = client.find_element(By::css("h1")).await?;
//!     println!("Heading: {}", heading.text().await?);
//!
//!     client.delete_session().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`actions`] | Input action composition (pointer, key, wheel) |
//! | [`client`] | Client handle, dispatcher, typed commands |
//! | [`element`] | Locator strategies and the element registry |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`multiremote`] | Concurrent fan-out over several sessions |
//! | [`protocol`] | Command table and wire envelope (internal-ish) |
//! | [`session`] | Capabilities, handshake, session views |
//! | [`transport`] | HTTP transport layer |
//! | [`vendor`] | Vendor session-status API and lifecycle hooks |

// ============================================================================
// Modules
// ============================================================================

/// Input action composition.
///
/// Build an [`actions::ActionSequence`] from pointer, key, and wheel
/// sources; one `perform` flushes it atomically.
pub mod actions;

/// Client handle, dispatcher, and typed command wrappers.
pub mod client;

/// Locator strategies and the element registry.
pub mod element;

/// Error types and [`Result`] alias.
pub mod error;

/// Type-safe ID wrappers.
pub mod identifiers;

/// Concurrent fan-out over several sessions.
pub mod multiremote;

/// Static command table and wire envelope handling.
pub mod protocol;

/// Capabilities, handshake, and session views.
pub mod session;

/// HTTP transport layer.
pub mod transport;

/// Vendor session-status API and lifecycle hooks.
pub mod vendor;

// ============================================================================
// Re-exports
// ============================================================================

pub use actions::{ActionSequence, KeyActions, PointerActions, PointerType, ScrollParams, WheelActions};
pub use client::{Client, ClientBuilder, Cookie, Element, Frame, Rect, ServerStatus, SessionTimeouts, WaitOptions};
pub use element::By;
pub use error::{Error, Result};
pub use identifiers::{ElementId, SessionId};
pub use multiremote::{Multiremote, MultiremoteBuilder};
pub use session::{Capabilities, Session, SessionInfo};
pub use transport::{HttpTransport, Timeouts, Transport, TransportConfig};
pub use vendor::{ReporterConfig, SessionStatus, StatusReporter, StatusUpdate, VendorApi, VendorConfig};
