//! Element locator strategies.
//!
//! W3C location strategies for the find-element command family.
//!
//! # Example
//!
//! ```ignore
//! use webdriver_client::By;
//!
//! // CSS selector (default)
//! let btn = client.find_element(By::css("#submit")).await?;
//!
//! // By XPath
//! let btn = client.find_element(By::xpath("//button[@type='submit']")).await?;
//!
//! // By link text
//! let link = client.find_element(By::link_text("Sign in")).await?;
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// By Enum
// ============================================================================

/// Element locator strategy.
///
/// Each variant maps to a W3C `using` string; the registry stores the
/// full locator so a stale reference can be re-queried with exactly the
/// original selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "using", content = "value")]
pub enum By {
    /// CSS selector (most common).
    #[serde(rename = "css selector")]
    Css(String),

    /// XPath expression.
    #[serde(rename = "xpath")]
    XPath(String),

    /// Exact link text (for `<a>` elements).
    #[serde(rename = "link text")]
    LinkText(String),

    /// Partial link text (for `<a>` elements).
    #[serde(rename = "partial link text")]
    PartialLinkText(String),

    /// Tag name.
    #[serde(rename = "tag name")]
    Tag(String),
}

impl By {
    /// Creates a CSS selector.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates an XPath selector.
    #[inline]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Creates a link text selector.
    #[inline]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Creates a partial link text selector.
    #[inline]
    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Self::PartialLinkText(text.into())
    }

    /// Creates a tag name selector.
    #[inline]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Returns the W3C `using` string for the protocol.
    #[must_use]
    pub fn using(&self) -> &'static str {
        match self {
            Self::Css(_) => "css selector",
            Self::XPath(_) => "xpath",
            Self::LinkText(_) => "link text",
            Self::PartialLinkText(_) => "partial link text",
            Self::Tag(_) => "tag name",
        }
    }

    /// Returns the selector value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v)
            | Self::XPath(v)
            | Self::LinkText(v)
            | Self::PartialLinkText(v)
            | Self::Tag(v) => v,
        }
    }

    /// Rebuilds a locator from a `using`/`value` pair off the wire.
    ///
    /// Returns `None` for an unrecognized strategy.
    #[must_use]
    pub fn from_using(using: &str, value: &str) -> Option<Self> {
        let value = value.to_string();
        match using {
            "css selector" => Some(Self::Css(value)),
            "xpath" => Some(Self::XPath(value)),
            "link text" => Some(Self::LinkText(value)),
            "partial link text" => Some(Self::PartialLinkText(value)),
            "tag name" => Some(Self::Tag(value)),
            _ => None,
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.using(), self.value())
    }
}

// ============================================================================
// From implementations for ergonomics
// ============================================================================

impl From<&str> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: &str) -> Self {
        Self::Css(s.to_string())
    }
}

impl From<String> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: String) -> Self {
        Self::Css(s)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_css() {
        let by = By::css("#login");
        assert_eq!(by.using(), "css selector");
        assert_eq!(by.value(), "#login");
    }

    #[test]
    fn test_by_xpath() {
        let by = By::xpath("//button");
        assert_eq!(by.using(), "xpath");
        assert_eq!(by.value(), "//button");
    }

    #[test]
    fn test_display() {
        let by = By::link_text("Sign in");
        assert_eq!(by.to_string(), "link text=Sign in");
    }

    #[test]
    fn test_from_str_defaults_to_css() {
        let by: By = "#login".into();
        assert!(matches!(by, By::Css(_)));
    }

    #[test]
    fn test_from_using_round_trip() {
        for by in [
            By::css("#a"),
            By::xpath("//b"),
            By::link_text("c"),
            By::partial_link_text("d"),
            By::tag("e"),
        ] {
            let rebuilt = By::from_using(by.using(), by.value()).expect("known strategy");
            assert_eq!(rebuilt, by);
        }
    }

    #[test]
    fn test_from_using_unknown_strategy() {
        assert_eq!(By::from_using("telepathy", "x"), None);
    }
}
