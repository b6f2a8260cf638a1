//! Input action composition.
//!
//! Builds W3C input-action sequences (pointer, key, wheel) that are
//! flushed to the remote end as one atomic `performActions` dispatch.
//! Device sources and their steps keep caller order exactly: the remote
//! end relies on source ordering to interleave pointer and key channels
//! correctly, so the composer never reorders anything.
//!
//! # Example
//!
//! ```ignore
//! use webdriver_client::actions::{ActionSequence, PointerActions, PointerType};
//!
//! let mut actions = ActionSequence::new();
//! actions.pointer(
//!     PointerActions::new(PointerType::Mouse)
//!         .move_to(100, 200, 50)
//!         .down(0)
//!         .up(0),
//! );
//! actions.perform(&client).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::Client;
use crate::client::commands::params;
use crate::client::element::Element;
use crate::error::Result;

// ============================================================================
// PointerType
// ============================================================================

/// Pointer device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerType {
    #[default]
    Mouse,
    Pen,
    Touch,
}

impl PointerType {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mouse => "mouse",
            Self::Pen => "pen",
            Self::Touch => "touch",
        }
    }
}

// ============================================================================
// ScrollParams
// ============================================================================

/// Parameters for one wheel-scroll step.
///
/// Caller-supplied fields merge over the documented defaults: origin at
/// the viewport, all offsets and deltas zero, no duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScrollParams {
    /// Scroll origin x offset.
    pub x: i64,
    /// Scroll origin y offset.
    pub y: i64,
    /// Horizontal scroll distance.
    #[serde(rename = "deltaX")]
    pub delta_x: i64,
    /// Vertical scroll distance.
    #[serde(rename = "deltaY")]
    pub delta_y: i64,
    /// Step duration in milliseconds.
    pub duration: u64,
}

// ============================================================================
// Device Builders
// ============================================================================

/// Key device source under construction.
#[derive(Debug, Clone, Default)]
pub struct KeyActions {
    steps: Vec<Value>,
}

impl KeyActions {
    /// Creates an empty key source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Presses a key.
    #[must_use]
    pub fn key_down(mut self, key: char) -> Self {
        self.steps
            .push(json!({ "type": "keyDown", "value": key.to_string() }));
        self
    }

    /// Releases a key.
    #[must_use]
    pub fn key_up(mut self, key: char) -> Self {
        self.steps
            .push(json!({ "type": "keyUp", "value": key.to_string() }));
        self
    }

    /// Presses and releases each character in order.
    #[must_use]
    pub fn type_text(mut self, text: &str) -> Self {
        for key in text.chars() {
            self = self.key_down(key).key_up(key);
        }
        self
    }

    /// Pauses this channel for the given milliseconds.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.steps
            .push(json!({ "type": "pause", "duration": duration_ms }));
        self
    }
}

/// Pointer device source under construction.
#[derive(Debug, Clone)]
pub struct PointerActions {
    pointer_type: PointerType,
    steps: Vec<Value>,
}

impl PointerActions {
    /// Creates an empty pointer source of the given kind.
    #[must_use]
    pub fn new(pointer_type: PointerType) -> Self {
        Self {
            pointer_type,
            steps: Vec::new(),
        }
    }

    /// Moves to viewport coordinates over `duration_ms`.
    #[must_use]
    pub fn move_to(mut self, x: i64, y: i64, duration_ms: u64) -> Self {
        self.steps.push(json!({
            "type": "pointerMove",
            "origin": "viewport",
            "x": x,
            "y": y,
            "duration": duration_ms,
        }));
        self
    }

    /// Moves to the center of an element.
    #[must_use]
    pub fn move_to_element(mut self, element: &Element, duration_ms: u64) -> Self {
        self.steps.push(json!({
            "type": "pointerMove",
            "origin": element.reference(),
            "x": 0,
            "y": 0,
            "duration": duration_ms,
        }));
        self
    }

    /// Presses a pointer button (0 = left).
    #[must_use]
    pub fn down(mut self, button: u8) -> Self {
        self.steps
            .push(json!({ "type": "pointerDown", "button": button }));
        self
    }

    /// Releases a pointer button.
    #[must_use]
    pub fn up(mut self, button: u8) -> Self {
        self.steps
            .push(json!({ "type": "pointerUp", "button": button }));
        self
    }

    /// Cancels the current pointer input.
    #[must_use]
    pub fn cancel(mut self) -> Self {
        self.steps.push(json!({ "type": "pointerCancel" }));
        self
    }

    /// Pauses this channel for the given milliseconds.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.steps
            .push(json!({ "type": "pause", "duration": duration_ms }));
        self
    }
}

/// Wheel device source under construction.
#[derive(Debug, Clone, Default)]
pub struct WheelActions {
    steps: Vec<Value>,
}

impl WheelActions {
    /// Creates an empty wheel source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scroll step.
    ///
    /// Fields left at their [`ScrollParams`] defaults scroll nothing
    /// from the viewport origin.
    #[must_use]
    pub fn scroll(mut self, scroll: ScrollParams) -> Self {
        let mut step = json!({ "type": "scroll", "origin": "viewport" });
        if let (Value::Object(step), Value::Object(fields)) =
            (&mut step, serde_json::to_value(scroll).unwrap_or_default())
        {
            step.extend(fields);
        }
        self.steps.push(step);
        self
    }

    /// Pauses this channel for the given milliseconds.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.steps
            .push(json!({ "type": "pause", "duration": duration_ms }));
        self
    }
}

// ============================================================================
// ActionSequence
// ============================================================================

/// Ordered set of device sources, flushed as one request.
///
/// Sources accumulate in the order they are appended; device ids are
/// assigned per kind (`key-0`, `pointer-1`, ...). The sequence is atomic
/// from the caller's perspective: one dispatch carries all of it, and a
/// dispatch failure leaves nothing applied remotely.
#[derive(Debug, Default)]
pub struct ActionSequence {
    sources: Vec<Value>,
}

impl ActionSequence {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key source.
    pub fn key(&mut self, source: KeyActions) -> &mut Self {
        let id = format!("key-{}", self.sources.len());
        self.sources.push(json!({
            "type": "key",
            "id": id,
            "actions": source.steps,
        }));
        self
    }

    /// Appends a pointer source.
    pub fn pointer(&mut self, source: PointerActions) -> &mut Self {
        let id = format!("pointer-{}", self.sources.len());
        self.sources.push(json!({
            "type": "pointer",
            "id": id,
            "parameters": { "pointerType": source.pointer_type.as_str() },
            "actions": source.steps,
        }));
        self
    }

    /// Appends a wheel source.
    pub fn wheel(&mut self, source: WheelActions) -> &mut Self {
        let id = format!("wheel-{}", self.sources.len());
        self.sources.push(json!({
            "type": "wheel",
            "id": id,
            "actions": source.steps,
        }));
        self
    }

    /// Returns the number of accumulated sources.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` if nothing has accumulated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Flushes the sequence as a single `performActions` dispatch and
    /// clears it.
    ///
    /// An empty sequence is a local no-op. On dispatch failure the
    /// accumulated steps are kept so the caller can retry or
    /// [`ActionSequence::release`] them.
    pub async fn perform(&mut self, client: &Client) -> Result<()> {
        if self.sources.is_empty() {
            return Ok(());
        }

        debug!(sources = self.sources.len(), "Flushing action sequence");

        client
            .dispatch("performActions", params([("actions", json!(self.sources))]))
            .await?;

        self.sources.clear();
        Ok(())
    }

    /// Discards the accumulated steps without dispatching anything.
    pub fn release(&mut self) {
        self.sources.clear();
    }
}

// ============================================================================
// Remote Input State
// ============================================================================

impl Client {
    /// Releases all depressed keys and pointer buttons on the remote end.
    ///
    /// Unrelated to [`ActionSequence::release`], which is a local
    /// discard.
    pub async fn release_actions(&self) -> Result<()> {
        self.dispatch("releaseActions", serde_json::Map::new())
            .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
