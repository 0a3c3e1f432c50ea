//! Time-window policy deciding when a heap snapshot is due.
//!
//! The decision is a pure function of the instant: it fires whenever the
//! epoch milliseconds modulo the outer window fall inside the leading capture
//! window. It keeps no memory of earlier firings, so a tick cadence that lands
//! twice inside one capture window fires twice.

use std::time::Duration;

use chrono::{DateTime, Utc};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_CAPTURE_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPolicy {
    window_ms: i64,
    capture_window_ms: i64,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW.as_millis() as i64,
            capture_window_ms: DEFAULT_CAPTURE_WINDOW.as_millis() as i64,
        }
    }
}

impl TriggerPolicy {
    pub fn new(window: Duration, capture_window: Duration) -> Result<Self, String> {
        let window_ms = i64::try_from(window.as_millis())
            .map_err(|_| format!("trigger window {window:?} is too large"))?;
        let capture_window_ms = i64::try_from(capture_window.as_millis())
            .map_err(|_| format!("capture window {capture_window:?} is too large"))?;

        if window_ms == 0 {
            return Err("trigger window must be at least one millisecond".to_string());
        }
        if capture_window_ms > window_ms {
            return Err(format!(
                "capture window {capture_window:?} exceeds trigger window {window:?}"
            ));
        }

        Ok(Self {
            window_ms,
            capture_window_ms,
        })
    }

    pub fn should_capture(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis().rem_euclid(self.window_ms) < self.capture_window_ms
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms as u64)
    }

    pub fn capture_window(&self) -> Duration {
        Duration::from_millis(self.capture_window_ms as u64)
    }
}
