//! Polling helpers for element collections.
//!
//! [`Client::wait_for_elements`] polls the find command at a bounded
//! interval until the collection turns non-empty or the wait budget
//! expires. Emptiness is returned, not raised: the caller decides
//! whether an empty result is a failure.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use tracing::debug;

use crate::element::By;
use crate::error::Result;
use crate::protocol;

use super::element::find_params;
use super::{Client, Element};

// ============================================================================
// Constants
// ============================================================================

/// Floor for the polling interval; requested intervals below this are
/// clamped so a tight loop cannot hammer the remote end.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default interval between polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ============================================================================
// WaitOptions
// ============================================================================

/// Options for [`Client::wait_for_elements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Total wait budget.
    pub timeout: Duration,
    /// Interval between polls; clamped to a 100ms floor.
    pub interval: Duration,
    /// Re-run the collection query once more before returning and
    /// re-pair each handle with the fresh reference at its index, so no
    /// handle is carried over from an earlier poll of the same selector.
    pub full_refetch: bool,
}

impl WaitOptions {
    /// Creates options with the given wait budget.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Overrides the polling interval.
    #[inline]
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Enables the full refetch pass.
    #[inline]
    #[must_use]
    pub fn full_refetch(mut self) -> Self {
        self.full_refetch = true;
        self
    }

    fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: DEFAULT_POLL_INTERVAL,
            full_refetch: false,
        }
    }
}

// ============================================================================
// Waiting
// ============================================================================

impl Client {
    /// Polls a locator until it matches something or the budget expires.
    ///
    /// Returns whatever the final poll found, possibly an empty list.
    /// Protocol errors during a poll abort the wait.
    pub async fn wait_for_elements(
        &self,
        locator: impl Into<By>,
        options: WaitOptions,
    ) -> Result<Vec<Element>> {
        let by = locator.into();
        let interval = options.effective_interval();
        let started = Instant::now();

        loop {
            let found = self.find_elements(by.clone()).await?;

            if !found.is_empty() {
                debug!(locator = %by, count = found.len(), "Wait satisfied");
                if options.full_refetch {
                    self.refetch_collection(&by, &found).await?;
                }
                return Ok(found);
            }

            if started.elapsed() >= options.timeout {
                debug!(locator = %by, "Wait budget expired with no matches");
                return Ok(found);
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Runs the collection query one more time and re-pairs each handle
    /// with the fresh reference at its index.
    ///
    /// Handles past the end of the fresh list keep their old reference.
    async fn refetch_collection(&self, by: &By, found: &[Element]) -> Result<()> {
        let value = self.dispatch("findElements", find_params(by)).await?;
        for (element, id) in found.iter().zip(protocol::extract_element_ids(&value)) {
            element.adopt(id);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
