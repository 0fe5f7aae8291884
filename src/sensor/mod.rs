// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sensor link drivers
//!
//! The sampling loop only sees the two-call contract below: open a device
//! path into a handle, read a Celsius value from the handle. Everything
//! about the wire protocol lives behind it, which is also what lets tests
//! script the link with [`fake::FakeDriver`].

pub mod ds18b20;
pub mod fake;

pub use ds18b20::Ds18b20Driver;

use crate::error::{ConnectError, ReadError};

/// Opens sensor links on a device path
pub trait SensorDriver {
    type Handle: SensorHandle;

    /// Open the device and probe for a sensor
    fn open(&self, device: &str) -> Result<Self::Handle, ConnectError>;
}

/// An open sensor link
pub trait SensorHandle {
    /// Read one temperature in degrees Celsius
    fn read_temperature(&mut self) -> Result<f64, ReadError>;
}
