// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Log throttling
//!
//! An unattended exporter must not flood the journal. Successful readings
//! are logged on a fixed window; repeated identical failures collapse into
//! a single line, staying silent until the failure text changes, a read
//! succeeds, or the re-emit window elapses.
//!
//! All decisions are driven by a monotonic clock passed in by the caller,
//! so the policies are plain values that tests can drive with synthetic
//! timestamps.

use std::time::{Duration, Instant};

/// Event classes with distinct throttling policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent<'a> {
    /// Periodic "current reading" line, emitted at most once per window
    Reading,

    /// Connect or read failure, emitted when its identity changes
    Failure {
        /// Failure category ("connect", "read")
        category: &'a str,
        /// Rendered failure message
        message: &'a str,
    },
}

/// Identity of the last emitted failure line
#[derive(Debug, Clone, PartialEq, Eq)]
struct FailureKey {
    category: String,
    message: String,
}

impl FailureKey {
    fn matches(&self, category: &str, message: &str) -> bool {
        self.category == category && self.message == message
    }
}

/// Decides, per event and timestamp, whether a log line is worth emitting
#[derive(Debug)]
pub struct LogThrottle {
    reading_interval: Duration,
    failure_repeat: Duration,
    last_reading: Option<Instant>,
    last_failure: Option<(FailureKey, Instant)>,
}

impl LogThrottle {
    /// Default window between periodic reading lines (30 minutes)
    pub const DEFAULT_READING_INTERVAL: Duration = Duration::from_secs(30 * 60);

    /// Default re-emit window for an unchanged failure line
    pub const DEFAULT_FAILURE_REPEAT: Duration = Duration::from_secs(30 * 60);

    pub fn new(reading_interval: Duration, failure_repeat: Duration) -> Self {
        Self {
            reading_interval,
            failure_repeat,
            last_reading: None,
            last_failure: None,
        }
    }

    /// Whether `event` should be logged at `now`
    ///
    /// Side-effecting only on `true`: an emitted event updates the
    /// throttle state, a suppressed one leaves it untouched.
    pub fn should_emit(&mut self, event: LogEvent<'_>, now: Instant) -> bool {
        match event {
            LogEvent::Reading => {
                let due = self
                    .last_reading
                    .map_or(true, |at| now.duration_since(at) >= self.reading_interval);
                if due {
                    self.last_reading = Some(now);
                }
                due
            }
            LogEvent::Failure { category, message } => {
                let due = match &self.last_failure {
                    Some((key, at)) => {
                        !key.matches(category, message)
                            || now.duration_since(*at) >= self.failure_repeat
                    }
                    None => true,
                };
                if due {
                    let key = FailureKey {
                        category: category.to_string(),
                        message: message.to_string(),
                    };
                    self.last_failure = Some((key, now));
                }
                due
            }
        }
    }

    /// Forget the failure identity after a successful read, so the next
    /// failure logs immediately even if its text is unchanged.
    pub fn clear_failures(&mut self) {
        self.last_failure = None;
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_READING_INTERVAL,
            Self::DEFAULT_FAILURE_REPEAT,
        )
    }
}
