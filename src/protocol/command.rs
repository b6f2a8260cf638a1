//! Static command registry.
//!
//! Every logical command is described by a [`CommandDescriptor`] in one
//! explicit data table: HTTP method, endpoint URL template, required
//! parameters, and whether the response carries element references. The
//! table is built into a lookup registry once at startup and shared
//! read-only afterwards; there is no runtime reflection.
//!
//! URL templates use `:placeholder` path segments
//! (`/session/:sessionId/element/:elementId/click`). Placeholders are
//! filled from the active session, the element registry, and the call
//! parameters before a request is built — a request with an unresolved
//! placeholder is never emitted.

// ============================================================================
// Imports
// ============================================================================

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

// ============================================================================
// HttpMethod
// ============================================================================

/// HTTP method of a protocol endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Idempotent read.
    Get,
    /// State-changing call.
    Post,
    /// State-changing call.
    Put,
    /// State-changing call.
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Returns `true` if the transport may retry this method on transient
    /// network failure.
    ///
    /// Only GETs qualify. Retrying a state-changing call blindly risks
    /// double-applying it, so that responsibility stays with the caller.
    #[inline]
    #[must_use]
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Self::Get)
    }
}

// ============================================================================
// ElementYield
// ============================================================================

/// Whether a command's response carries element references.
///
/// Element-producing commands have their results registered in the
/// element registry before the dispatcher returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementYield {
    /// Response value carries no element references.
    None,
    /// Response value is a single web element reference.
    Single,
    /// Response value is an array of web element references.
    Many,
}

// ============================================================================
// TimeoutClass
// ============================================================================

/// Transport deadline class for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Session-level calls (handshake, teardown): 90s default.
    Session,
    /// Regular commands: 30s default.
    Command,
    /// Polling calls (server status): 10s default.
    Poll,
}

// ============================================================================
// CommandDescriptor
// ============================================================================

/// Static description of one protocol command.
///
/// Immutable, loaded once at startup, shared read-only.
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    /// Logical command name.
    pub name: &'static str,
    /// HTTP method.
    pub method: HttpMethod,
    /// Endpoint URL template with `:placeholder` segments.
    pub url_template: &'static str,
    /// Parameters that must be present in the call params.
    pub required: &'static [&'static str],
    /// Element-reference yield of the response.
    pub element_yield: ElementYield,
    /// Transport deadline class.
    pub timeout_class: TimeoutClass,
}

impl CommandDescriptor {
    /// Returns the placeholder names in this descriptor's URL template.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        self.url_template
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
    }

    /// Returns `true` if this command runs against an active session.
    #[inline]
    #[must_use]
    pub fn is_session_scoped(&self) -> bool {
        self.placeholders().any(|p| p == "sessionId")
    }
}

// ============================================================================
// Command Table
// ============================================================================

/// The complete W3C WebDriver command table.
pub const COMMANDS: &[CommandDescriptor] = &[
    // ------------------------------------------------------------------
    // Server / session lifecycle
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "status",
        method: HttpMethod::Get,
        url_template: "/status",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Poll,
    },
    CommandDescriptor {
        name: "newSession",
        method: HttpMethod::Post,
        url_template: "/session",
        required: &["capabilities"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Session,
    },
    CommandDescriptor {
        name: "deleteSession",
        method: HttpMethod::Delete,
        url_template: "/session/:sessionId",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Session,
    },
    CommandDescriptor {
        name: "getTimeouts",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/timeouts",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "setTimeouts",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/timeouts",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "navigateTo",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/url",
        required: &["url"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getUrl",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/url",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "back",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/back",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "forward",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/forward",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "refresh",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/refresh",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getTitle",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/title",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getPageSource",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/source",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Windows and frames
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "getWindowHandle",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/window",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "closeWindow",
        method: HttpMethod::Delete,
        url_template: "/session/:sessionId/window",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "switchToWindow",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/window",
        required: &["handle"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getWindowHandles",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/window/handles",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "switchToFrame",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/frame",
        required: &["id"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "switchToParentFrame",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/frame/parent",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Element lookup
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "findElement",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/element",
        required: &["using", "value"],
        element_yield: ElementYield::Single,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "findElements",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/elements",
        required: &["using", "value"],
        element_yield: ElementYield::Many,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "findElementFromElement",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/element/:elementId/element",
        required: &["using", "value"],
        element_yield: ElementYield::Single,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "findElementsFromElement",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/element/:elementId/elements",
        required: &["using", "value"],
        element_yield: ElementYield::Many,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getActiveElement",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/active",
        required: &[],
        element_yield: ElementYield::Single,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Element state
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "isElementSelected",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/selected",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "isElementEnabled",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/enabled",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getElementAttribute",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/attribute/:name",
        required: &["name"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getElementProperty",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/property/:name",
        required: &["name"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getElementCssValue",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/css/:propertyName",
        required: &["propertyName"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getElementText",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/text",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getElementTagName",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/name",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getElementRect",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/rect",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Element interaction
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "elementClick",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/element/:elementId/click",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "elementClear",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/element/:elementId/clear",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "elementSendKeys",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/element/:elementId/value",
        required: &["text"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Script execution
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "executeScript",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/execute/sync",
        required: &["script", "args"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "executeAsyncScript",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/execute/async",
        required: &["script", "args"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Cookies
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "getAllCookies",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/cookie",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getNamedCookie",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/cookie/:name",
        required: &["name"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "addCookie",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/cookie",
        required: &["cookie"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "deleteCookie",
        method: HttpMethod::Delete,
        url_template: "/session/:sessionId/cookie/:name",
        required: &["name"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "deleteAllCookies",
        method: HttpMethod::Delete,
        url_template: "/session/:sessionId/cookie",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Input actions
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "performActions",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/actions",
        required: &["actions"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "releaseActions",
        method: HttpMethod::Delete,
        url_template: "/session/:sessionId/actions",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "dismissAlert",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/alert/dismiss",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "acceptAlert",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/alert/accept",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "getAlertText",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/alert/text",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "sendAlertText",
        method: HttpMethod::Post,
        url_template: "/session/:sessionId/alert/text",
        required: &["text"],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    // ------------------------------------------------------------------
    // Screenshots
    // ------------------------------------------------------------------
    CommandDescriptor {
        name: "takeScreenshot",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/screenshot",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
    CommandDescriptor {
        name: "takeElementScreenshot",
        method: HttpMethod::Get,
        url_template: "/session/:sessionId/element/:elementId/screenshot",
        required: &[],
        element_yield: ElementYield::None,
        timeout_class: TimeoutClass::Command,
    },
];

// ============================================================================
// CommandRegistry
// ============================================================================

/// Name-indexed view over [`COMMANDS`].
///
/// Built once at startup via [`CommandRegistry::global`] and shared
/// read-only afterwards.
#[derive(Debug)]
pub struct CommandRegistry {
    by_name: FxHashMap<&'static str, &'static CommandDescriptor>,
}

static REGISTRY: OnceLock<CommandRegistry> = OnceLock::new();

impl CommandRegistry {
    /// Builds the registry from the static command table.
    #[must_use]
    pub fn new() -> Self {
        let mut by_name = FxHashMap::default();
        for descriptor in COMMANDS {
            by_name.insert(descriptor.name, descriptor);
        }
        Self { by_name }
    }

    /// Returns the shared registry, building and validating it on first use.
    pub fn global() -> &'static Self {
        REGISTRY.get_or_init(|| {
            let registry = Self::new();
            debug_assert!(registry.validate().is_ok(), "command table is malformed");
            registry
        })
    }

    /// Looks up a command descriptor by logical name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownCommand`] if the name is not in the table.
    pub fn get(&self, name: &str) -> Result<&'static CommandDescriptor> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::unknown_command(name))
    }

    /// Returns the number of registered commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns `true` if the registry is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Validates the command table.
    ///
    /// Checks that names are unique, templates are absolute, and every
    /// placeholder is a plain identifier.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] describing the first malformed entry.
    pub fn validate(&self) -> Result<()> {
        if self.by_name.len() != COMMANDS.len() {
            return Err(Error::config("duplicate command name in table"));
        }

        for descriptor in COMMANDS {
            if !descriptor.url_template.starts_with('/') {
                return Err(Error::config(format!(
                    "command {}: template must be absolute: {}",
                    descriptor.name, descriptor.url_template
                )));
            }

            for placeholder in descriptor.placeholders() {
                let well_formed = !placeholder.is_empty()
                    && placeholder.chars().all(|c| c.is_ascii_alphanumeric());
                if !well_formed {
                    return Err(Error::config(format!(
                        "command {}: malformed placeholder :{placeholder}",
                        descriptor.name
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Template Filling
// ============================================================================

/// Fills a URL template's `:placeholder` segments.
///
/// `resolve` maps a placeholder name to its value; values are
/// percent-encoded into the path. The result never contains an
/// unresolved placeholder.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `resolve` has no value for a
/// placeholder.
pub fn fill_template<F>(template: &str, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut filled = String::with_capacity(template.len());

    for segment in template.split('/') {
        if segment.is_empty() {
            continue;
        }

        filled.push('/');
        match segment.strip_prefix(':') {
            Some(name) => {
                let value = resolve(name).ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "unresolved placeholder :{name} in {template}"
                    ))
                })?;
                filled.push_str(&urlencoding::encode(&value));
            }
            None => filled.push_str(segment),
        }
    }

    Ok(filled)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_table_validates() {
        CommandRegistry::new().validate().expect("table is valid");
    }

    #[test]
    fn test_global_lookup() {
        let registry = CommandRegistry::global();
        let descriptor = registry.get("elementClick").expect("known command");

        assert_eq!(descriptor.method, HttpMethod::Post);
        assert_eq!(
            descriptor.url_template,
            "/session/:sessionId/element/:elementId/click"
        );
        assert!(descriptor.is_session_scoped());
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::global();
        let err = registry.get("teleport").unwrap_err();
        assert!(matches!(err, Error::UnknownCommand { .. }));
    }

    #[test]
    fn test_placeholders() {
        let descriptor = CommandRegistry::global()
            .get("getElementAttribute")
            .expect("known command");
        let names: Vec<_> = descriptor.placeholders().collect();
        assert_eq!(names, vec!["sessionId", "elementId", "name"]);
    }

    #[test]
    fn test_new_session_not_session_scoped() {
        let descriptor = CommandRegistry::global()
            .get("newSession")
            .expect("known command");
        assert!(!descriptor.is_session_scoped());
        assert_eq!(descriptor.timeout_class, TimeoutClass::Session);
    }

    #[test]
    fn test_only_gets_are_idempotent() {
        for descriptor in COMMANDS {
            assert_eq!(
                descriptor.method.is_idempotent(),
                descriptor.method == HttpMethod::Get,
                "{}",
                descriptor.name
            );
        }
    }

    #[test]
    fn test_fill_template() {
        let url = fill_template("/session/:sessionId/element/:elementId/click", |name| {
            match name {
                "sessionId" => Some("abc".to_string()),
                "elementId" => Some("node-1".to_string()),
                _ => None,
            }
        })
        .expect("fill");

        assert_eq!(url, "/session/abc/element/node-1/click");
    }

    #[test]
    fn test_fill_template_missing_placeholder() {
        let err = fill_template("/session/:sessionId/url", |_| None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(err.to_string().contains(":sessionId"));
    }

    #[test]
    fn test_fill_template_percent_encodes() {
        let url = fill_template("/session/:sessionId/cookie/:name", |name| match name {
            "sessionId" => Some("abc".to_string()),
            "name" => Some("se ssion/id".to_string()),
            _ => None,
        })
        .expect("fill");

        assert_eq!(url, "/session/abc/cookie/se%20ssion%2Fid");
    }

    proptest! {
        /// Filled URLs never contain an unresolved placeholder token,
        /// whatever values the parameters carry.
        #[test]
        fn prop_filled_urls_have_no_placeholders(
            session in "[^/]*",
            element in "[^/]*",
            name in "[^/]*",
        ) {
            for descriptor in COMMANDS {
                let url = fill_template(descriptor.url_template, |placeholder| {
                    Some(match placeholder {
                        "sessionId" => session.clone(),
                        "elementId" => element.clone(),
                        _ => name.clone(),
                    })
                })
                .expect("every placeholder resolves");

                for segment in url.split('/') {
                    prop_assert!(!segment.starts_with(':'), "unresolved token in {url}");
                }
            }
        }
    }
}
