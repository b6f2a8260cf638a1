//! Element handle registry.
//!
//! Maps server-assigned element references to logical handles that
//! remember how each element was located. Staleness is not tracked by
//! identity: the remote end reports it on use, and the stored locator is
//! what makes the re-find retry path possible.
//!
//! Entries are `Arc`-wrapped and replaced whole (copy-on-write), so a
//! concurrent reader never observes a half-updated handle and no lock is
//! held across a suspension point.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::identifiers::{ElementId, SessionId};

use super::By;

// ============================================================================
// ElementHandle
// ============================================================================

/// Logical handle for one located element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle {
    /// Server-assigned element reference.
    pub id: ElementId,
    /// Session that owns this reference.
    pub session: SessionId,
    /// Locator that produced this element, if known.
    ///
    /// `None` for elements not produced by a find command (e.g. the
    /// active element); those cannot be re-found after going stale.
    pub locator: Option<By>,
    /// Parent element for relative lookups, if any.
    pub parent: Option<ElementId>,
}

// ============================================================================
// ElementRegistry
// ============================================================================

/// Registry of live element handles for one session.
///
/// Scoped to a single logical browser handle; no cross-handle sharing.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    entries: RwLock<FxHashMap<ElementId, Arc<ElementHandle>>>,
}

impl ElementRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle, returning the shared entry.
    pub fn register(&self, handle: ElementHandle) -> Arc<ElementHandle> {
        let entry = Arc::new(handle);
        self.entries
            .write()
            .insert(entry.id.clone(), Arc::clone(&entry));
        entry
    }

    /// Resolves a logical handle to the id used in request templates.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the id was never registered with
    /// this session's registry.
    pub fn resolve(&self, id: &ElementId) -> Result<String> {
        self.entries
            .read()
            .get(id)
            .map(|entry| entry.id.as_str().to_string())
            .ok_or_else(|| Error::invalid_argument(format!("unknown element handle: {id}")))
    }

    /// Returns the shared entry for an id.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<Arc<ElementHandle>> {
        self.entries.read().get(id).cloned()
    }

    /// Replaces a stale entry with its re-found successor.
    ///
    /// The old entry is removed and the new handle inserted in one
    /// write; concurrent readers see either the old or the new entry.
    pub fn replace(&self, stale: &ElementId, handle: ElementHandle) -> Arc<ElementHandle> {
        let entry = Arc::new(handle);
        let mut entries = self.entries.write();
        entries.remove(stale);
        entries.insert(entry.id.clone(), Arc::clone(&entry));
        entry
    }

    /// Returns the number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no handles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str, locator: By) -> ElementHandle {
        ElementHandle {
            id: ElementId::new(id),
            session: SessionId::new("session-1"),
            locator: Some(locator),
            parent: None,
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ElementRegistry::new();
        registry.register(handle("node-1", By::css("#foo")));

        let resolved = registry.resolve(&ElementId::new("node-1")).expect("known");
        assert_eq!(resolved, "node-1");
    }

    #[test]
    fn test_resolve_unknown_is_local_error() {
        let registry = ElementRegistry::new();
        let err = registry.resolve(&ElementId::new("ghost")).unwrap_err();
        assert!(err.is_local());
    }

    #[test]
    fn test_registry_keeps_original_locator() {
        let registry = ElementRegistry::new();
        registry.register(handle("node-1", By::css("#foo")));

        let entry = registry.get(&ElementId::new("node-1")).expect("known");
        assert_eq!(entry.locator, Some(By::css("#foo")));
    }

    #[test]
    fn test_replace_swaps_entry() {
        let registry = ElementRegistry::new();
        registry.register(handle("node-1", By::css("#foo")));

        let old = registry.get(&ElementId::new("node-1")).expect("known");
        registry.replace(&ElementId::new("node-1"), handle("node-2", By::css("#foo")));

        assert!(registry.get(&ElementId::new("node-1")).is_none());
        let new = registry.get(&ElementId::new("node-2")).expect("replaced");
        // The old Arc is still usable by readers that held it.
        assert_eq!(old.id.as_str(), "node-1");
        assert_eq!(new.locator, old.locator);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ElementRegistry::new();
        assert!(registry.is_empty());
        registry.register(handle("node-1", By::css("#foo")));
        assert!(!registry.is_empty());
    }
}
