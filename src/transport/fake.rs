//! In-process fake transport for dispatcher tests.
//!
//! Records every request and replays scripted replies in order. With no
//! reply scripted it answers `{ "value": null }`, the shape of a
//! successful void command.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::protocol::{HttpMethod, WireReply};

use super::Transport;

// ============================================================================
// RecordedCall
// ============================================================================

/// One request as seen by the fake.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

// ============================================================================
// FakeTransport
// ============================================================================

/// Scripted transport double.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<VecDeque<Result<WireReply>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a success envelope `{ "value": value }`.
    pub fn reply_value(&self, value: Value) {
        self.replies
            .lock()
            .push_back(Ok(WireReply::new(200, json!({ "value": value }))));
    }

    /// Scripts a WebDriver error envelope.
    pub fn reply_error(&self, status: u16, code: &str, message: &str) {
        self.replies.lock().push_back(Ok(WireReply::new(
            status,
            json!({ "value": {
                "error": code,
                "message": message,
                "stacktrace": "",
            }}),
        )));
    }

    /// Scripts a raw reply.
    pub fn reply_raw(&self, reply: WireReply) {
        self.replies.lock().push_back(Ok(reply));
    }

    /// Scripts a transport-level failure.
    pub fn reply_failure(&self, error: Error) {
        self.replies.lock().push_back(Err(error));
    }

    /// Returns a snapshot of all recorded calls.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of requests seen.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        _deadline: Duration,
    ) -> Result<WireReply> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            body,
        });

        match self.replies.lock().pop_front() {
            Some(reply) => reply,
            None => Ok(WireReply::new(200, json!({ "value": null }))),
        }
    }
}
