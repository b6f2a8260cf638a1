//! Element identity: locator strategies and the handle registry.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `by` | W3C locator strategies ([`By`]) |
//! | `registry` | Handle registry with copy-on-write entries |

/// W3C locator strategies.
pub mod by;

/// Element handle registry.
pub mod registry;

pub use by::By;
pub use registry::{ElementHandle, ElementRegistry};
