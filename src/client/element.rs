//! Element handles with stale re-find.
//!
//! An [`Element`] pairs a client with a registry entry. When the remote
//! end reports the reference stale and the original locator is known,
//! the handle re-runs exactly that locator once (relative to its parent
//! if it was a child lookup), swaps the registry entry, and retries the
//! command. A second stale report surfaces to the caller.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::element::{By, ElementHandle};
use crate::error::{Error, Result};
use crate::identifiers::ElementId;
use crate::protocol;

use super::commands::{Rect, decode_screenshot, params};
use super::Client;

// ============================================================================
// Element
// ============================================================================

/// Handle to one located element.
///
/// Cheap to clone; clones share the registry entry, so a re-find through
/// one clone is visible to all of them.
#[derive(Debug, Clone)]
pub struct Element {
    client: Client,
    state: Arc<ElementState>,
}

#[derive(Debug)]
struct ElementState {
    /// Current registry entry; swapped whole on re-find.
    handle: RwLock<Arc<ElementHandle>>,
}

impl Element {
    pub(crate) fn new(client: Client, handle: Arc<ElementHandle>) -> Self {
        Self {
            client,
            state: Arc::new(ElementState {
                handle: RwLock::new(handle),
            }),
        }
    }

    /// Returns the current server-assigned element ID.
    ///
    /// May change after a stale re-find.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.state.handle.read().id.clone()
    }

    /// Returns the locator that produced this element, if known.
    #[must_use]
    pub fn locator(&self) -> Option<By> {
        self.state.handle.read().locator.clone()
    }

    /// Returns the wire form of this element for script arguments.
    #[must_use]
    pub fn reference(&self) -> Value {
        protocol::element_reference(&self.id())
    }

    fn handle(&self) -> Arc<ElementHandle> {
        Arc::clone(&self.state.handle.read())
    }
}

// ============================================================================
// Dispatch with Stale Re-find
// ============================================================================

impl Element {
    /// Dispatches an element-scoped command.
    ///
    /// On a stale-element report the original locator is re-run exactly
    /// once and the command retried against the replacement reference.
    /// Elements without a stored locator (e.g. the active element) are
    /// not re-found.
    pub async fn command(&self, name: &str, extra: Map<String, Value>) -> Result<Value> {
        let mut refound = false;
        loop {
            let handle = self.handle();
            let mut call = extra.clone();
            call.insert("elementId".to_string(), json!(handle.id.as_str()));

            match self.client.dispatch(name, call).await {
                Ok(value) => return Ok(value),
                Err(Error::StaleElement { .. }) if !refound && handle.locator.is_some() => {
                    debug!(element = %handle.id, command = name, "Stale reference, re-finding");
                    let entry = self.refind(&handle).await?;
                    *self.state.handle.write() = entry;
                    refound = true;
                }
                // The envelope does not echo the id back; supply it here.
                Err(Error::StaleElement { .. }) => {
                    return Err(Error::stale_element(handle.id.clone()));
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Points this handle at a replacement reference, swapping the
    /// registry entry in one write.
    ///
    /// No-op when the id is unchanged.
    pub(crate) fn adopt(&self, id: ElementId) {
        let handle = self.handle();
        if handle.id == id {
            return;
        }
        let entry = self.client.elements().replace(
            &handle.id,
            ElementHandle {
                id,
                session: handle.session.clone(),
                locator: handle.locator.clone(),
                parent: handle.parent.clone(),
            },
        );
        *self.state.handle.write() = entry;
    }

    /// Re-runs the original locator and swaps the registry entry.
    async fn refind(&self, stale: &ElementHandle) -> Result<Arc<ElementHandle>> {
        let locator = stale
            .locator
            .clone()
            .ok_or_else(|| Error::stale_element(stale.id.clone()))?;

        let find = params([
            ("using", json!(locator.using())),
            ("value", json!(locator.value())),
        ]);

        let value = match &stale.parent {
            Some(parent) => {
                let mut call = find;
                call.insert("elementId".to_string(), json!(parent.as_str()));
                self.client.dispatch("findElementFromElement", call).await?
            }
            None => self.client.dispatch("findElement", find).await?,
        };

        let id = protocol::extract_element_id(&value)
            .ok_or_else(|| Error::stale_element(stale.id.clone()))?;

        // Swap the stale entry for the replacement in one write.
        Ok(self.client.elements().replace(
            &stale.id,
            ElementHandle {
                id,
                session: stale.session.clone(),
                locator: Some(locator),
                parent: stale.parent.clone(),
            },
        ))
    }
}

// ============================================================================
// Element Commands
// ============================================================================

impl Element {
    /// Clicks the element.
    pub async fn click(&self) -> Result<()> {
        self.command("elementClick", Map::new()).await?;
        Ok(())
    }

    /// Clears an editable element's value.
    pub async fn clear(&self) -> Result<()> {
        self.command("elementClear", Map::new()).await?;
        Ok(())
    }

    /// Types text into the element.
    pub async fn send_keys(&self, text: impl Into<String>) -> Result<()> {
        self.command("elementSendKeys", params([("text", json!(text.into()))]))
            .await?;
        Ok(())
    }

    /// Returns the element's rendered text.
    pub async fn text(&self) -> Result<String> {
        self.command_string("getElementText").await
    }

    /// Returns the element's tag name.
    pub async fn tag_name(&self) -> Result<String> {
        self.command_string("getElementTagName").await
    }

    /// Returns an attribute value, or `None` if the attribute is absent.
    pub async fn attribute(&self, name: impl Into<String>) -> Result<Option<String>> {
        let value = self
            .command("getElementAttribute", params([("name", json!(name.into()))]))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// Returns a JavaScript property value.
    pub async fn property(&self, name: impl Into<String>) -> Result<Value> {
        self.command("getElementProperty", params([("name", json!(name.into()))]))
            .await
    }

    /// Returns a computed CSS value.
    pub async fn css_value(&self, property: impl Into<String>) -> Result<String> {
        let value = self
            .command(
                "getElementCssValue",
                params([("propertyName", json!(property.into()))]),
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Returns the element's geometry.
    pub async fn rect(&self) -> Result<Rect> {
        let value = self.command("getElementRect", Map::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Returns `true` if the element is selected.
    pub async fn is_selected(&self) -> Result<bool> {
        let value = self.command("isElementSelected", Map::new()).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Returns `true` if the element is enabled.
    pub async fn is_enabled(&self) -> Result<bool> {
        let value = self.command("isElementEnabled", Map::new()).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Takes a screenshot of this element, decoded to PNG bytes.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let encoded = self.command_string("takeElementScreenshot").await?;
        decode_screenshot(&encoded)
    }

    /// Finds a child element relative to this one.
    pub async fn find_element(&self, locator: impl Into<By>) -> Result<Element> {
        let by = locator.into();
        let value = self
            .command("findElementFromElement", find_params(&by))
            .await
            .map_err(|error| rewrite_not_found(error, &by))?;
        self.client.element_from_value(&value)
    }

    /// Finds all matching child elements; empty when nothing matches.
    pub async fn find_elements(&self, locator: impl Into<By>) -> Result<Vec<Element>> {
        let by = locator.into();
        let value = self
            .command("findElementsFromElement", find_params(&by))
            .await?;
        self.client.elements_from_value(&value)
    }

    async fn command_string(&self, name: &str) -> Result<String> {
        let value = self.command(name, Map::new()).await?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            Error::protocol(
                "malformed value",
                format!("{name}: expected a string value"),
                200,
                value.to_string(),
            )
        })
    }
}

impl PartialEq for Element {
    /// Two handles are equal when they point at the same reference.
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

// ============================================================================
// Client Find Commands
// ============================================================================

impl Client {
    /// Finds the first element matching a locator.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchElement`] carrying the locator when nothing
    /// matches.
    pub async fn find_element(&self, locator: impl Into<By>) -> Result<Element> {
        let by = locator.into();
        let value = self
            .dispatch("findElement", find_params(&by))
            .await
            .map_err(|error| rewrite_not_found(error, &by))?;
        self.element_from_value(&value)
    }

    /// Finds all elements matching a locator.
    ///
    /// An empty list is a valid result, not an error.
    pub async fn find_elements(&self, locator: impl Into<By>) -> Result<Vec<Element>> {
        let by = locator.into();
        let value = self.dispatch("findElements", find_params(&by)).await?;
        self.elements_from_value(&value)
    }

    /// Returns the element with keyboard focus.
    ///
    /// Active elements carry no locator and cannot be re-found when
    /// stale.
    pub async fn active_element(&self) -> Result<Element> {
        let value = self.dispatch("getActiveElement", Map::new()).await?;
        self.element_from_value(&value)
    }

    /// Wraps a single-element response value in a handle.
    pub(crate) fn element_from_value(&self, value: &Value) -> Result<Element> {
        let id = protocol::extract_element_id(value).ok_or_else(|| {
            Error::protocol(
                "malformed value",
                "expected a web element reference",
                200,
                value.to_string(),
            )
        })?;
        let entry = self
            .elements()
            .get(&id)
            .ok_or_else(|| Error::invalid_argument(format!("unregistered element: {id}")))?;
        Ok(Element::new(self.clone(), entry))
    }

    /// Wraps a many-element response value in handles.
    pub(crate) fn elements_from_value(&self, value: &Value) -> Result<Vec<Element>> {
        protocol::extract_element_ids(value)
            .into_iter()
            .map(|id| {
                let entry = self
                    .elements()
                    .get(&id)
                    .ok_or_else(|| Error::invalid_argument(format!("unregistered element: {id}")))?;
                Ok(Element::new(self.clone(), entry))
            })
            .collect()
    }
}

pub(crate) fn find_params(by: &By) -> Map<String, Value> {
    params([("using", json!(by.using())), ("value", json!(by.value()))])
}

/// Attaches the human-readable locator to not-found errors.
fn rewrite_not_found(error: Error, by: &By) -> Error {
    match error {
        Error::NoSuchElement { .. } => Error::no_such_element(by.to_string()),
        other => other,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::client::tests::fake_client;
    use crate::protocol::WEB_ELEMENT_KEY;

    #[tokio::test]
    async fn test_find_element_then_click() {
        let (client, transport) = fake_client();
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-1" }));
        transport.reply_value(json!(null));

        let element = client.find_element(By::css("#foo")).await.expect("find");
        element.click().await.expect("click");

        let calls = transport.calls();
        assert_eq!(calls[0].path, "/session/sess-1/element");
        assert_eq!(
            calls[0].body,
            Some(json!({ "using": "css selector", "value": "#foo" }))
        );
        assert_eq!(calls[1].path, "/session/sess-1/element/node-1/click");
    }

    #[tokio::test]
    async fn test_find_then_resolve_is_stable() {
        let (client, transport) = fake_client();
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-1" }));

        let element = client.find_element(By::css("#foo")).await.expect("find");

        let resolved = client.elements().resolve(&element.id()).expect("resolve");
        assert_eq!(resolved, "node-1");
        assert_eq!(
            client.elements().resolve(&element.id()).expect("resolve"),
            resolved
        );
    }

    #[tokio::test]
    async fn test_not_found_carries_locator() {
        let (client, transport) = fake_client();
        transport.reply_error(404, "no such element", "Unable to locate element");

        let err = client.find_element(By::css("#missing")).await.unwrap_err();

        match err {
            Error::NoSuchElement { locator } => {
                assert_eq!(locator, "css selector=#missing");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_elements_empty_is_ok() {
        let (client, transport) = fake_client();
        transport.reply_value(json!([]));

        let elements = client.find_elements(By::css(".none")).await.expect("find");
        assert!(elements.is_empty());
    }

    #[tokio::test]
    async fn test_stale_click_refinds_with_original_selector() {
        let (client, transport) = fake_client();
        // find, stale click, re-find, retried click
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-1" }));
        transport.reply_error(404, "stale element reference", "detached");
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-2" }));
        transport.reply_value(json!(null));

        let element = client.find_element(By::css("#foo")).await.expect("find");
        element.click().await.expect("click after re-find");

        let calls = transport.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls[2].body,
            Some(json!({ "using": "css selector", "value": "#foo" })),
            "re-find reissues the exact original selector"
        );
        assert_eq!(calls[3].path, "/session/sess-1/element/node-2/click");

        // The handle and the registry both track the replacement.
        assert_eq!(element.id(), ElementId::new("node-2"));
        assert!(client.elements().get(&ElementId::new("node-1")).is_none());
    }

    #[tokio::test]
    async fn test_stale_twice_surfaces_with_element_id() {
        let (client, transport) = fake_client();
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-1" }));
        transport.reply_error(404, "stale element reference", "detached");
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-2" }));
        transport.reply_error(404, "stale element reference", "detached again");

        let element = client.find_element(By::css("#foo")).await.expect("find");
        let err = element.click().await.unwrap_err();

        match err {
            Error::StaleElement { element_id } => {
                assert_eq!(element_id, ElementId::new("node-2"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_active_element_is_not_refindable() {
        let (client, transport) = fake_client();
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "focus-1" }));
        transport.reply_error(404, "stale element reference", "detached");

        let element = client.active_element().await.expect("active");
        assert_eq!(element.locator(), None);

        let err = element.click().await.unwrap_err();
        assert!(matches!(err, Error::StaleElement { .. }));
        assert_eq!(transport.call_count(), 2, "no re-find was attempted");
    }

    #[tokio::test]
    async fn test_child_refind_is_parent_relative() {
        let (client, transport) = fake_client();
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "root" }));
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "child-1" }));
        transport.reply_error(404, "stale element reference", "detached");
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "child-2" }));
        transport.reply_value(json!("hello"));

        let root = client.find_element(By::css("#root")).await.expect("find");
        let child = root.find_element(By::css(".child")).await.expect("child");
        let text = child.text().await.expect("text after re-find");

        assert_eq!(text, "hello");
        let calls = transport.calls();
        assert_eq!(
            calls[3].path, "/session/sess-1/element/root/element",
            "re-find goes through the original parent"
        );
    }

    #[tokio::test]
    async fn test_attribute_absent_is_none() {
        let (client, transport) = fake_client();
        transport.reply_value(json!({ WEB_ELEMENT_KEY: "node-1" }));
        transport.reply_value(json!(null));

        let element = client.find_element(By::css("#foo")).await.expect("find");
        let value = element.attribute("data-missing").await.expect("attribute");
        assert_eq!(value, None);
    }
}
