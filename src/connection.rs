// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sensor link lifecycle
//!
//! At most one live handle at any time, owned here and nowhere else. A
//! failed read tears the link down via [`ConnectionManager::reset`]
//! before the next tick begins, so a stale handle is never reused.

use crate::error::ConnectError;
use crate::sensor::SensorDriver;

/// Link state: no handle, or exactly one open handle
enum Link<H> {
    Absent,
    Open(H),
}

/// Owns the single sensor link and its open/close lifecycle
pub struct ConnectionManager<D: SensorDriver> {
    driver: D,
    device: String,
    link: Link<D::Handle>,
}

impl<D: SensorDriver> ConnectionManager<D> {
    /// Start with no link; nothing is opened until the first
    /// [`ensure_open`](Self::ensure_open).
    pub fn new(driver: D, device: impl Into<String>) -> Self {
        Self {
            driver,
            device: device.into(),
            link: Link::Absent,
        }
    }

    /// Open the link if it is not already open and hand out the handle.
    ///
    /// On failure the state stays absent and the caller skips its read
    /// for this tick; the next tick retries. There is no synchronous
    /// retry here.
    pub fn ensure_open(&mut self) -> Result<&mut D::Handle, ConnectError> {
        if let Link::Absent = self.link {
            let handle = self.driver.open(&self.device)?;
            self.link = Link::Open(handle);
        }
        match &mut self.link {
            Link::Open(handle) => Ok(handle),
            Link::Absent => unreachable!("link was opened above"),
        }
    }

    /// Drop the handle, closing the underlying device. Idempotent.
    pub fn reset(&mut self) {
        self.link = Link::Absent;
    }

    /// Whether a handle is currently held
    pub fn is_open(&self) -> bool {
        matches!(self.link, Link::Open(_))
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::fake::FakeDriver;

    #[test]
    fn test_starts_absent() {
        let manager = ConnectionManager::new(FakeDriver::new(), "/dev/fake");
        assert!(!manager.is_open());
        assert_eq!(manager.device(), "/dev/fake");
    }

    #[test]
    fn test_ensure_open_transitions_to_open() {
        let mut manager = ConnectionManager::new(FakeDriver::new(), "/dev/fake");
        assert!(manager.ensure_open().is_ok());
        assert!(manager.is_open());
    }

    #[test]
    fn test_ensure_open_reuses_the_handle() {
        let driver = FakeDriver::new();
        let mut manager = ConnectionManager::new(driver.clone(), "/dev/fake");
        manager.ensure_open().unwrap();
        manager.ensure_open().unwrap();
        assert_eq!(driver.open_attempts(), 1);
    }

    #[test]
    fn test_failed_open_stays_absent() {
        let driver = FakeDriver::new();
        driver.fail_opens(1);
        let mut manager = ConnectionManager::new(driver.clone(), "/dev/fake");
        assert!(manager.ensure_open().is_err());
        assert!(!manager.is_open());
        // The next attempt opens fresh.
        assert!(manager.ensure_open().is_ok());
        assert_eq!(driver.open_attempts(), 2);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let driver = FakeDriver::new();
        let mut manager = ConnectionManager::new(driver.clone(), "/dev/fake");
        manager.reset();
        assert!(!manager.is_open());

        manager.ensure_open().unwrap();
        manager.reset();
        assert!(!manager.is_open());
        manager.reset();
        assert!(!manager.is_open());

        // Reopening after a reset goes back to the driver.
        manager.ensure_open().unwrap();
        assert_eq!(driver.open_attempts(), 2);
    }
}
