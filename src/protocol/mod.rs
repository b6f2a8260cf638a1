//! WebDriver wire protocol definitions.
//!
//! This module owns the static command table and the response envelope
//! rules; it knows nothing about HTTP clients or sessions.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command descriptors, registry, URL template filling |
//! | `response` | `{ value }` envelope validation and error mapping |

// ============================================================================
// Submodules
// ============================================================================

/// Command descriptors and the startup-validated registry.
pub mod command;

/// Response envelope validation and web element references.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    COMMANDS, CommandDescriptor, CommandRegistry, ElementYield, HttpMethod, TimeoutClass,
    fill_template,
};
pub use response::{
    WEB_ELEMENT_KEY, ErrorValue, WireReply, element_reference, extract_element_id,
    extract_element_ids, unwrap_envelope,
};
