//! Simulated progress, rotating status messages and the observer trait.
//!
//! The extraction service gives no intermediate feedback, so while a request
//! is in flight the controller fakes it: a percentage that climbs quickly,
//! then slowly, then parks below 100, and a status line that cycles through
//! a fixed list of phase descriptions. Only the real response moves the bar
//! to 100.
//!
//! Inject an [`Arc<dyn LifecycleObserver>`] via
//! [`crate::config::ClientConfigBuilder::observer`] to receive these events
//! as they happen.
//!
//! # Example
//!
//! ```rust
//! use finextract::{ClientConfig, LifecycleObserver};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl LifecycleObserver for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .observer(Arc::new(LastPercent(AtomicU8::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Status lines shown while the backend works, in display order.
pub const DEFAULT_STATUS_MESSAGES: [&str; 8] = [
    "Uploading PDF to the extraction service...",
    "Initialising document analysis...",
    "Analysing document structure...",
    "Locating financial tables...",
    "Mapping line items to the statement schema...",
    "Cleaning numerical data...",
    "Finalising yearly figures...",
    "Generating formatted Excel workbook...",
];

/// Step function for the simulated progress percentage.
///
/// | Current value        | Next value                  |
/// |----------------------|-----------------------------|
/// | `< fast_until`       | `+ fast_step`               |
/// | `< ceiling`          | `+ slow_step`               |
/// | `>= ceiling`         | unchanged                   |
///
/// The result is capped at `ceiling`, which must stay below 100 so only a
/// completed request can fill the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSchedule {
    pub fast_step: u8,
    pub fast_until: u8,
    pub slow_step: u8,
    pub ceiling: u8,
}

impl Default for ProgressSchedule {
    fn default() -> Self {
        Self {
            fast_step: 5,
            fast_until: 70,
            slow_step: 1,
            ceiling: 95,
        }
    }
}

impl ProgressSchedule {
    /// The value after one tick. Never smaller than `current`.
    pub fn advance(&self, current: u8) -> u8 {
        if current >= self.ceiling {
            return current;
        }
        let step = if current < self.fast_until {
            self.fast_step
        } else {
            self.slow_step
        };
        current.saturating_add(step).min(self.ceiling)
    }

    /// Number of ticks needed to reach the ceiling from zero.
    pub fn ticks_to_ceiling(&self) -> usize {
        let mut value = 0u8;
        let mut ticks = 0;
        while value < self.ceiling {
            let next = self.advance(value);
            if next == value {
                break;
            }
            value = next;
            ticks += 1;
        }
        ticks
    }
}

/// Cursor over the status message list, wrapping at the end.
#[derive(Debug, Clone)]
pub struct StatusRotation {
    messages: Arc<[String]>,
    index: usize,
}

impl StatusRotation {
    /// Start at the first message. `messages` must be non-empty; the config
    /// builder enforces this.
    pub fn new(messages: Arc<[String]>) -> Self {
        Self { messages, index: 0 }
    }

    pub fn current(&self) -> &str {
        &self.messages[self.index]
    }

    /// Move to the next message and return it.
    pub fn advance(&mut self) -> &str {
        self.index = (self.index + 1) % self.messages.len();
        self.current()
    }
}

/// Called by the controller as a request moves through its lifecycle.
///
/// Implementations must be `Send + Sync`: ticks are delivered from spawned
/// timer tasks. All methods have default no-op implementations so callers
/// only override what they care about.
pub trait LifecycleObserver: Send + Sync {
    /// Called when a request enters Processing.
    ///
    /// # Arguments
    /// * `file_name`  — name of the uploaded file
    /// * `page_count` — pages counted at selection time
    fn on_processing_start(&self, file_name: &str, page_count: usize) {
        let _ = (file_name, page_count);
    }

    /// Called on every progress change, including the final 100 or 0.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called each time the rotating status line changes.
    fn on_status(&self, message: &str) {
        let _ = message;
    }

    /// Called when the request completes.
    ///
    /// # Arguments
    /// * `total_rows` — rows across all four categories after normalisation
    fn on_complete(&self, total_rows: usize) {
        let _ = total_rows;
    }

    /// Called when the request fails, with the user-facing message.
    fn on_failed(&self, user_message: &str) {
        let _ = user_message;
    }
}

/// Observer for callers that don't need lifecycle events.
pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ObserverHandle = Arc<dyn LifecycleObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn default_messages() -> Arc<[String]> {
        DEFAULT_STATUS_MESSAGES
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn schedule_climbs_fast_then_slow() {
        let s = ProgressSchedule::default();
        assert_eq!(s.advance(0), 5);
        assert_eq!(s.advance(65), 70);
        assert_eq!(s.advance(70), 71);
        assert_eq!(s.advance(94), 95);
    }

    #[test]
    fn schedule_parks_at_ceiling() {
        let s = ProgressSchedule::default();
        assert_eq!(s.advance(95), 95);
        assert_eq!(s.advance(99), 99);
    }

    #[test]
    fn schedule_never_overshoots_ceiling() {
        let s = ProgressSchedule {
            fast_step: 30,
            fast_until: 90,
            slow_step: 1,
            ceiling: 80,
        };
        assert_eq!(s.advance(60), 80);
    }

    #[test]
    fn schedule_is_monotonic_and_stays_below_100() {
        let s = ProgressSchedule::default();
        let mut value = 0;
        for _ in 0..200 {
            let next = s.advance(value);
            assert!(next >= value);
            assert!(next < 100);
            value = next;
        }
        assert_eq!(value, 95);
    }

    #[test]
    fn default_schedule_tick_count() {
        // 14 fast ticks to 70, 25 slow ticks to 95.
        assert_eq!(ProgressSchedule::default().ticks_to_ceiling(), 39);
    }

    #[test]
    fn rotation_wraps() {
        let mut r = StatusRotation::new(default_messages());
        assert_eq!(r.current(), DEFAULT_STATUS_MESSAGES[0]);
        for i in 1..DEFAULT_STATUS_MESSAGES.len() {
            assert_eq!(r.advance(), DEFAULT_STATUS_MESSAGES[i]);
        }
        assert_eq!(r.advance(), DEFAULT_STATUS_MESSAGES[0]);
    }

    #[test]
    fn single_message_rotation_repeats() {
        let mut r = StatusRotation::new(vec!["Working...".to_string()].into());
        assert_eq!(r.advance(), "Working...");
        assert_eq!(r.advance(), "Working...");
    }

    struct CountingObserver {
        ticks: AtomicUsize,
    }

    impl LifecycleObserver for CountingObserver {
        fn on_progress(&self, _percent: u8) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_processing_start("report.pdf", 3);
        o.on_progress(5);
        o.on_status("Analysing...");
        o.on_complete(12);
        o.on_failed("Extraction failed.");
    }

    #[test]
    fn arc_dyn_observer_receives_events() {
        let counter = Arc::new(CountingObserver {
            ticks: AtomicUsize::new(0),
        });
        let handle: ObserverHandle = counter.clone();
        handle.on_progress(5);
        handle.on_progress(10);
        handle.on_status("ignored by this observer");
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 2);
    }
}
