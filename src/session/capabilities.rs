//! Capability sets for session negotiation.
//!
//! A [`Capabilities`] value is the JSON object sent in the new-session
//! handshake's `alwaysMatch` slot. The builder keeps the map open-ended:
//! vendor-prefixed keys (`goog:chromeOptions`, `bstack:options`, ...)
//! go through [`Capabilities::set`].

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// ============================================================================
// Constants
// ============================================================================

/// Capability keys that mark a mobile-app session.
///
/// Presence of any of these (on requested or negotiated capabilities)
/// routes vendor REST calls to the app-automate base path. Not part of
/// the WebDriver protocol itself.
pub(crate) const APP_CAPABILITY_KEYS: &[&str] = &[
    "app",
    "appium:app",
    "appPackage",
    "appium:appPackage",
    "appActivity",
    "appium:appActivity",
    "bundleId",
    "appium:bundleId",
];

// ============================================================================
// Capabilities
// ============================================================================

/// Requested capability set for one browser instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(Map<String, Value>);

impl Capabilities {
    /// Creates an empty capability set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a capability set for Chrome.
    #[inline]
    #[must_use]
    pub fn chrome() -> Self {
        Self::new().browser_name("chrome")
    }

    /// Creates a capability set for Firefox.
    #[inline]
    #[must_use]
    pub fn firefox() -> Self {
        Self::new().browser_name("firefox")
    }

    /// Sets `browserName`.
    #[inline]
    #[must_use]
    pub fn browser_name(self, name: impl Into<String>) -> Self {
        self.set("browserName", name.into())
    }

    /// Sets `platformName`.
    #[inline]
    #[must_use]
    pub fn platform_name(self, name: impl Into<String>) -> Self {
        self.set("platformName", name.into())
    }

    /// Sets `acceptInsecureCerts`.
    #[inline]
    #[must_use]
    pub fn accept_insecure_certs(self, accept: bool) -> Self {
        self.set("acceptInsecureCerts", accept)
    }

    /// Sets an arbitrary capability.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns a capability value.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying capability map.
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns `true` if a mobile-app capability key is present.
    #[must_use]
    pub fn is_app_automate(&self) -> bool {
        APP_CAPABILITY_KEYS.iter().any(|key| self.0.contains_key(*key))
    }

    /// Builds the new-session request body.
    #[must_use]
    pub fn new_session_payload(&self) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": self.0,
                "firstMatch": [{}],
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let caps = Capabilities::chrome()
            .platform_name("linux")
            .accept_insecure_certs(true)
            .set("goog:chromeOptions", json!({ "args": ["--headless"] }));

        assert_eq!(caps.get("browserName"), Some(&json!("chrome")));
        assert_eq!(caps.get("platformName"), Some(&json!("linux")));
        assert_eq!(caps.get("acceptInsecureCerts"), Some(&json!(true)));
    }

    #[test]
    fn test_new_session_payload_shape() {
        let payload = Capabilities::firefox().new_session_payload();

        assert_eq!(
            payload["capabilities"]["alwaysMatch"]["browserName"],
            json!("firefox")
        );
        assert_eq!(payload["capabilities"]["firstMatch"], json!([{}]));
    }

    #[test]
    fn test_is_app_automate() {
        assert!(!Capabilities::chrome().is_app_automate());
        assert!(Capabilities::new().set("app", "/tmp/app.apk").is_app_automate());
        assert!(
            Capabilities::new()
                .set("appium:appPackage", "com.example")
                .is_app_automate()
        );
    }

    #[test]
    fn test_serde_transparent() {
        let caps = Capabilities::chrome();
        let json = serde_json::to_value(&caps).expect("serialize");
        assert_eq!(json, json!({ "browserName": "chrome" }));
    }
}
