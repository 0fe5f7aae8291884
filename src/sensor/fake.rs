// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Scripted fake sensor link for tests
//!
//! Open outcomes and read outcomes are queued up front; the fake replays
//! them in order and records how often the device was opened. An
//! exhausted read script fails with [`ReadError::NoPresence`] so a test
//! that runs one tick too many fails loudly instead of inventing data.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{ConnectError, ReadError};
use crate::sensor::{SensorDriver, SensorHandle};

#[derive(Default)]
struct Plan {
    opens: VecDeque<bool>,
    reads: VecDeque<Result<f64, ReadError>>,
    open_attempts: usize,
}

/// Fake driver replaying a scripted link
#[derive(Clone, Default)]
pub struct FakeDriver {
    plan: Arc<Mutex<Plan>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one open outcome; an empty open script always succeeds.
    pub fn script_open(&self, ok: bool) {
        self.plan.lock().unwrap().opens.push_back(ok);
    }

    /// Queue `n` failing opens.
    pub fn fail_opens(&self, n: usize) {
        for _ in 0..n {
            self.script_open(false);
        }
    }

    /// Queue a successful read of `value`.
    pub fn script_value(&self, value: f64) {
        self.script_read(Ok(value));
    }

    /// Queue one read outcome.
    pub fn script_read(&self, outcome: Result<f64, ReadError>) {
        self.plan.lock().unwrap().reads.push_back(outcome);
    }

    /// How many times `open` was attempted, successful or not.
    pub fn open_attempts(&self) -> usize {
        self.plan.lock().unwrap().open_attempts
    }
}

impl SensorDriver for FakeDriver {
    type Handle = FakeHandle;

    fn open(&self, device: &str) -> Result<FakeHandle, ConnectError> {
        let mut plan = self.plan.lock().unwrap();
        plan.open_attempts += 1;
        if plan.opens.pop_front().unwrap_or(true) {
            Ok(FakeHandle {
                plan: Arc::clone(&self.plan),
            })
        } else {
            Err(ConnectError::NoSensor {
                device: device.to_string(),
            })
        }
    }
}

/// Handle over the shared script
pub struct FakeHandle {
    plan: Arc<Mutex<Plan>>,
}

impl SensorHandle for FakeHandle {
    fn read_temperature(&mut self) -> Result<f64, ReadError> {
        self.plan
            .lock()
            .unwrap()
            .reads
            .pop_front()
            .unwrap_or(Err(ReadError::NoPresence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_reads_in_order() {
        let driver = FakeDriver::new();
        driver.script_value(21.37);
        driver.script_read(Err(ReadError::NoPresence));
        driver.script_value(21.5);

        let mut handle = driver.open("/dev/fake").unwrap();
        assert_eq!(handle.read_temperature().unwrap(), 21.37);
        assert!(handle.read_temperature().is_err());
        assert_eq!(handle.read_temperature().unwrap(), 21.5);
    }

    #[test]
    fn test_scripted_open_failures_then_success() {
        let driver = FakeDriver::new();
        driver.fail_opens(2);

        assert!(driver.open("/dev/fake").is_err());
        assert!(driver.open("/dev/fake").is_err());
        assert!(driver.open("/dev/fake").is_ok());
        assert_eq!(driver.open_attempts(), 3);
    }

    #[test]
    fn test_exhausted_script_fails_the_read() {
        let driver = FakeDriver::new();
        let mut handle = driver.open("/dev/fake").unwrap();
        assert!(matches!(
            handle.read_temperature(),
            Err(ReadError::NoPresence)
        ));
    }
}
