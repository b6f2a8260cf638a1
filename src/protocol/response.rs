//! Response envelope handling.
//!
//! WebDriver wraps every response body as `{ "value": <payload> }`;
//! error responses carry `{ "value": { "error", "message", "stacktrace" } }`.
//! This module validates that envelope, maps remote error codes onto the
//! crate error taxonomy, and extracts W3C web element references.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::ElementId;

// ============================================================================
// Constants
// ============================================================================

/// W3C web element reference key.
///
/// A web element on the wire is `{ WEB_ELEMENT_KEY: "<element id>" }`.
pub const WEB_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

// ============================================================================
// WireReply
// ============================================================================

/// Raw HTTP reply as produced by the transport.
///
/// Envelope validation happens here, not in the transport, so that the
/// raw body is still available for diagnostics when the envelope does
/// not conform.
#[derive(Debug, Clone)]
pub struct WireReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Value,
}

impl WireReply {
    /// Creates a reply from status and body.
    #[inline]
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

// ============================================================================
// Error Payload
// ============================================================================

/// Error payload inside the `value` field of an error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorValue {
    /// WebDriver error code.
    pub error: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Remote stack trace, if any.
    #[serde(default)]
    pub stacktrace: Option<String>,
}

// ============================================================================
// Envelope Validation
// ============================================================================

/// Unwraps the `{ value: ... }` envelope of a reply.
///
/// # Errors
///
/// - [`Error::Protocol`] if the body is not an object with a `value`
///   field (the raw body is carried for diagnostics).
/// - The mapped taxonomy error for a conforming error envelope:
///   [`Error::StaleElement`], [`Error::NoSuchElement`],
///   [`Error::SessionCreation`], or [`Error::Protocol`] for the rest.
pub fn unwrap_envelope(reply: WireReply) -> Result<Value> {
    let Some(object) = reply.body.as_object() else {
        return Err(malformed(&reply));
    };

    let Some(value) = object.get("value") else {
        return Err(malformed(&reply));
    };

    // HTTP status alone is not trusted: some remote ends return 200 with
    // an error payload, others 4xx/5xx with a success-shaped body. On a
    // 200, only the full error/message/stacktrace shape counts as an
    // error, so script results that merely contain an `error` key are
    // not misclassified.
    if reply.status >= 400 {
        return match serde_json::from_value::<ErrorValue>(value.clone()) {
            Ok(payload) => Err(map_error(payload, &reply)),
            Err(_) => Err(malformed(&reply)),
        };
    }

    let full_error_shape = value.as_object().is_some_and(|payload| {
        payload.contains_key("error")
            && payload.contains_key("message")
            && payload.contains_key("stacktrace")
    });
    if full_error_shape
        && let Ok(payload) = serde_json::from_value::<ErrorValue>(value.clone())
    {
        return Err(map_error(payload, &reply));
    }

    Ok(value.clone())
}

/// Builds a protocol error for a non-conforming envelope.
fn malformed(reply: &WireReply) -> Error {
    Error::protocol(
        "malformed envelope",
        "response body is not a WebDriver { value } envelope",
        reply.status,
        reply.body.to_string(),
    )
}

/// Maps a WebDriver error code onto the crate taxonomy.
fn map_error(payload: ErrorValue, reply: &WireReply) -> Error {
    match payload.error.as_str() {
        "stale element reference" => {
            // The id of the stale reference is not echoed back; the caller
            // operating on the element supplies it when rethrowing.
            Error::stale_element(ElementId::new(""))
        }
        "no such element" => Error::no_such_element(payload.message),
        "session not created" => Error::session_creation(payload.message),
        code => Error::protocol(
            code.to_string(),
            payload.message,
            reply.status,
            reply.body.to_string(),
        ),
    }
}

// ============================================================================
// Web Element References
// ============================================================================

/// Extracts a single web element reference from a response value.
#[must_use]
pub fn extract_element_id(value: &Value) -> Option<ElementId> {
    value
        .get(WEB_ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementId::new)
}

/// Extracts an array of web element references from a response value.
///
/// Non-reference entries are skipped.
#[must_use]
pub fn extract_element_ids(value: &Value) -> Vec<ElementId> {
    value
        .as_array()
        .map(|entries| entries.iter().filter_map(extract_element_id).collect())
        .unwrap_or_default()
}

/// Builds the wire form of a web element reference.
///
/// Used for script arguments and frame-switch targets.
#[must_use]
pub fn element_reference(id: &ElementId) -> Value {
    let mut object = Map::new();
    object.insert(
        WEB_ELEMENT_KEY.to_string(),
        Value::String(id.as_str().to_string()),
    );
    Value::Object(object)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_unwrap_success() {
        let reply = WireReply::new(200, json!({ "value": "My Title" }));
        let value = unwrap_envelope(reply).expect("success envelope");
        assert_eq!(value, json!("My Title"));
    }

    #[test]
    fn test_unwrap_null_value() {
        let reply = WireReply::new(200, json!({ "value": null }));
        let value = unwrap_envelope(reply).expect("success envelope");
        assert!(value.is_null());
    }

    #[test]
    fn test_non_conforming_envelope_carries_raw_body() {
        let reply = WireReply::new(200, json!({ "data": 42 }));
        let err = unwrap_envelope(reply).unwrap_err();

        match err {
            Error::Protocol { body, .. } => assert!(body.contains("42")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_error_envelope_maps_stale() {
        let reply = WireReply::new(
            404,
            json!({ "value": {
                "error": "stale element reference",
                "message": "element is not attached",
                "stacktrace": ""
            }}),
        );
        let err = unwrap_envelope(reply).unwrap_err();
        assert!(matches!(err, Error::StaleElement { .. }));
    }

    #[test]
    fn test_error_envelope_maps_no_such_element() {
        let reply = WireReply::new(
            404,
            json!({ "value": {
                "error": "no such element",
                "message": "Unable to locate element",
            }}),
        );
        let err = unwrap_envelope(reply).unwrap_err();
        assert!(matches!(err, Error::NoSuchElement { .. }));
    }

    #[test]
    fn test_error_envelope_maps_session_not_created() {
        let reply = WireReply::new(
            500,
            json!({ "value": {
                "error": "session not created",
                "message": "capabilities rejected",
            }}),
        );
        let err = unwrap_envelope(reply).unwrap_err();
        assert!(matches!(err, Error::SessionCreation { .. }));
    }

    #[test]
    fn test_error_envelope_keeps_unmapped_code() {
        let reply = WireReply::new(
            400,
            json!({ "value": {
                "error": "invalid selector",
                "message": "bad css",
            }}),
        );
        let err = unwrap_envelope(reply).unwrap_err();

        match err {
            Error::Protocol { error, status, .. } => {
                assert_eq!(error, "invalid selector");
                assert_eq!(status, 400);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_error_status_with_success_body_is_malformed() {
        let reply = WireReply::new(500, json!({ "value": "fine" }));
        assert!(unwrap_envelope(reply).is_err());
    }

    #[test]
    fn test_extract_element_id() {
        let value = json!({ WEB_ELEMENT_KEY: "node-9" });
        assert_eq!(extract_element_id(&value), Some(ElementId::new("node-9")));
        assert_eq!(extract_element_id(&json!({ "other": "x" })), None);
    }

    #[test]
    fn test_extract_element_ids() {
        let value = json!([
            { WEB_ELEMENT_KEY: "a" },
            { "junk": true },
            { WEB_ELEMENT_KEY: "b" },
        ]);
        let ids = extract_element_ids(&value);
        assert_eq!(ids, vec![ElementId::new("a"), ElementId::new("b")]);
    }

    #[test]
    fn test_element_reference_round_trip() {
        let id = ElementId::new("node-3");
        let reference = element_reference(&id);
        assert_eq!(extract_element_id(&reference), Some(id));
    }
}
