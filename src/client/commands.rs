//! Typed wrappers over the W3C command table.
//!
//! Each method maps one-to-one onto a command descriptor; the dispatcher
//! does the placeholder filling, envelope validation, and element
//! registration. Anything not covered here can still go through
//! [`Client::dispatch`] directly.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::protocol;

use super::{Client, Element};

// ============================================================================
// Wire Types
// ============================================================================

/// Remote end readiness, from the `status` command.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerStatus {
    /// Whether the remote end can accept new sessions.
    #[serde(default)]
    pub ready: bool,
    /// Free-form readiness message.
    #[serde(default)]
    pub message: String,
}

/// Session timeout configuration, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTimeouts {
    /// Script execution budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<u64>,
    /// Page load budget.
    #[serde(rename = "pageLoad", skip_serializing_if = "Option::is_none")]
    pub page_load: Option<u64>,
    /// Implicit element wait.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<u64>,
}

/// An HTTP cookie as exchanged with the remote end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(rename = "httpOnly", skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    /// Expiry as seconds since the epoch; session cookie when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(rename = "sameSite", skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl Cookie {
    /// Creates a session cookie with only name and value set.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            secure: None,
            http_only: None,
            expiry: None,
            same_site: None,
        }
    }
}

/// Element geometry in CSS pixels, viewport-relative.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Frame-switch target.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Top-level browsing context.
    Top,
    /// Frame by zero-based index.
    Index(u16),
    /// Frame by its container element.
    Element(Element),
}

// ============================================================================
// Server / Navigation Commands
// ============================================================================

impl Client {
    /// Queries remote end readiness.
    ///
    /// Reachable without an active session.
    pub async fn status(&self) -> Result<ServerStatus> {
        let value = self.dispatch("status", Map::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Navigates to a URL.
    pub async fn goto(&self, url: impl Into<String>) -> Result<()> {
        self.dispatch("navigateTo", params([("url", json!(url.into()))]))
            .await?;
        Ok(())
    }

    /// Returns the current URL.
    pub async fn current_url(&self) -> Result<String> {
        self.dispatch_string("getUrl").await
    }

    /// Navigates back in history.
    pub async fn back(&self) -> Result<()> {
        self.dispatch("back", Map::new()).await?;
        Ok(())
    }

    /// Navigates forward in history.
    pub async fn forward(&self) -> Result<()> {
        self.dispatch("forward", Map::new()).await?;
        Ok(())
    }

    /// Reloads the current page.
    pub async fn refresh(&self) -> Result<()> {
        self.dispatch("refresh", Map::new()).await?;
        Ok(())
    }

    /// Returns the page title.
    pub async fn title(&self) -> Result<String> {
        self.dispatch_string("getTitle").await
    }

    /// Returns the page source.
    pub async fn page_source(&self) -> Result<String> {
        self.dispatch_string("getPageSource").await
    }

    /// Reads the session timeout configuration.
    pub async fn get_timeouts(&self) -> Result<SessionTimeouts> {
        let value = self.dispatch("getTimeouts", Map::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Writes the session timeout configuration.
    pub async fn set_timeouts(&self, timeouts: &SessionTimeouts) -> Result<()> {
        let body = serde_json::to_value(timeouts)?;
        let Value::Object(body) = body else {
            return Err(Error::invalid_argument("timeouts must serialize to an object"));
        };
        self.dispatch("setTimeouts", body).await?;
        Ok(())
    }
}

// ============================================================================
// Window / Frame Commands
// ============================================================================

impl Client {
    /// Returns the current window handle.
    pub async fn window_handle(&self) -> Result<String> {
        self.dispatch_string("getWindowHandle").await
    }

    /// Returns all window handles.
    pub async fn window_handles(&self) -> Result<Vec<String>> {
        let value = self.dispatch("getWindowHandles", Map::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Closes the current window.
    pub async fn close_window(&self) -> Result<()> {
        self.dispatch("closeWindow", Map::new()).await?;
        Ok(())
    }

    /// Switches to another window.
    pub async fn switch_to_window(&self, handle: impl Into<String>) -> Result<()> {
        self.dispatch("switchToWindow", params([("handle", json!(handle.into()))]))
            .await?;
        Ok(())
    }

    /// Switches the browsing context to a frame.
    pub async fn switch_to_frame(&self, frame: Frame) -> Result<()> {
        let id = match frame {
            Frame::Top => Value::Null,
            Frame::Index(index) => json!(index),
            Frame::Element(element) => protocol::element_reference(&element.id()),
        };
        self.dispatch("switchToFrame", params([("id", id)])).await?;
        Ok(())
    }

    /// Switches to the parent frame.
    pub async fn switch_to_parent_frame(&self) -> Result<()> {
        self.dispatch("switchToParentFrame", Map::new()).await?;
        Ok(())
    }
}

// ============================================================================
// Script / Cookie / Alert Commands
// ============================================================================

impl Client {
    /// Executes synchronous JavaScript in the page.
    ///
    /// Element handles can be passed as arguments via
    /// [`Element::reference`].
    pub async fn execute(&self, script: impl Into<String>, args: Vec<Value>) -> Result<Value> {
        self.dispatch(
            "executeScript",
            params([("script", json!(script.into())), ("args", json!(args))]),
        )
        .await
    }

    /// Executes JavaScript that completes via its final callback argument.
    pub async fn execute_async(
        &self,
        script: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<Value> {
        self.dispatch(
            "executeAsyncScript",
            params([("script", json!(script.into())), ("args", json!(args))]),
        )
        .await
    }

    /// Returns all cookies visible to the current page.
    pub async fn cookies(&self) -> Result<Vec<Cookie>> {
        let value = self.dispatch("getAllCookies", Map::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Returns one cookie by name.
    pub async fn cookie(&self, name: impl Into<String>) -> Result<Cookie> {
        let value = self
            .dispatch("getNamedCookie", params([("name", json!(name.into()))]))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Adds a cookie.
    pub async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        self.dispatch("addCookie", params([("cookie", serde_json::to_value(cookie)?)]))
            .await?;
        Ok(())
    }

    /// Deletes one cookie by name.
    pub async fn delete_cookie(&self, name: impl Into<String>) -> Result<()> {
        self.dispatch("deleteCookie", params([("name", json!(name.into()))]))
            .await?;
        Ok(())
    }

    /// Deletes all cookies.
    pub async fn delete_all_cookies(&self) -> Result<()> {
        self.dispatch("deleteAllCookies", Map::new()).await?;
        Ok(())
    }

    /// Accepts the current alert.
    pub async fn accept_alert(&self) -> Result<()> {
        self.dispatch("acceptAlert", Map::new()).await?;
        Ok(())
    }

    /// Dismisses the current alert.
    pub async fn dismiss_alert(&self) -> Result<()> {
        self.dispatch("dismissAlert", Map::new()).await?;
        Ok(())
    }

    /// Returns the current alert's text.
    pub async fn alert_text(&self) -> Result<String> {
        self.dispatch_string("getAlertText").await
    }

    /// Types into the current alert's prompt.
    pub async fn send_alert_text(&self, text: impl Into<String>) -> Result<()> {
        self.dispatch("sendAlertText", params([("text", json!(text.into()))]))
            .await?;
        Ok(())
    }

    /// Takes a viewport screenshot, decoded from base64 to PNG bytes.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let encoded = self.dispatch_string("takeScreenshot").await?;
        decode_screenshot(&encoded)
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Client {
    /// Dispatches a parameterless command expecting a string value.
    async fn dispatch_string(&self, command: &str) -> Result<String> {
        let value = self.dispatch(command, Map::new()).await?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            Error::protocol(
                "malformed value",
                format!("{command}: expected a string value"),
                200,
                value.to_string(),
            )
        })
    }
}

/// Builds a params map from literal entries.
pub(crate) fn params<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Decodes a base64 screenshot payload.
pub(crate) fn decode_screenshot(encoded: &str) -> Result<Vec<u8>> {
    BASE64.decode(encoded.trim()).map_err(|e| {
        Error::protocol(
            "malformed value",
            format!("screenshot is not valid base64: {e}"),
            200,
            String::new(),
        )
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::client::tests::fake_client;

    #[tokio::test]
    async fn test_goto_sends_url_body() {
        let (client, transport) = fake_client();
        transport.reply_value(json!(null));

        client.goto("https://example.com").await.expect("goto");

        let call = &transport.calls()[0];
        assert_eq!(call.path, "/session/sess-1/url");
        assert_eq!(call.body, Some(json!({ "url": "https://example.com" })));
    }

    #[tokio::test]
    async fn test_title_rejects_non_string_value() {
        let (client, transport) = fake_client();
        transport.reply_value(json!(42));

        let err = client.title().await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_cookie_round_trip_shape() {
        let (client, transport) = fake_client();
        transport.reply_value(json!(null));

        let cookie = Cookie {
            http_only: Some(true),
            ..Cookie::new("token", "abc")
        };
        client.add_cookie(&cookie).await.expect("add");

        let body = transport.calls()[0].body.clone().expect("body");
        assert_eq!(body["cookie"]["name"], json!("token"));
        assert_eq!(body["cookie"]["httpOnly"], json!(true));
        // Unset optional fields are omitted, not nulled.
        assert!(body["cookie"].get("domain").is_none());
    }

    #[tokio::test]
    async fn test_set_timeouts_uses_wire_names() {
        let (client, transport) = fake_client();
        transport.reply_value(json!(null));

        client
            .set_timeouts(&SessionTimeouts {
                page_load: Some(20_000),
                ..SessionTimeouts::default()
            })
            .await
            .expect("set");

        let body = transport.calls()[0].body.clone().expect("body");
        assert_eq!(body, json!({ "pageLoad": 20_000 }));
    }

    #[tokio::test]
    async fn test_switch_to_top_frame_sends_null() {
        let (client, transport) = fake_client();
        transport.reply_value(json!(null));

        client.switch_to_frame(Frame::Top).await.expect("switch");

        let body = transport.calls()[0].body.clone().expect("body");
        assert_eq!(body, json!({ "id": null }));
    }

    #[tokio::test]
    async fn test_screenshot_decodes_base64() {
        let (client, transport) = fake_client();
        transport.reply_value(json!(BASE64.encode(b"png-bytes")));

        let bytes = client.screenshot().await.expect("screenshot");
        assert_eq!(bytes, b"png-bytes");
    }

    #[test]
    fn test_decode_screenshot_rejects_garbage() {
        assert!(decode_screenshot("!!not base64!!").is_err());
    }
}
