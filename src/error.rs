// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the exporter
//!
//! Both categories are recoverable by design: a connect failure leaves the
//! link absent and is retried on the next tick, a read failure forces a
//! full reconnect. Neither ever terminates the process.

use thiserror::Error;

/// Failure while opening the sensor link
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Serial device could not be opened
    #[error("Failed to open {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },

    /// Device opened but nothing answered the presence probe
    #[error("No sensor present on {device}")]
    NoSensor { device: String },

    /// Probe I/O failed right after open
    #[error("Probe failed on {device}: {source}")]
    Probe {
        device: String,
        #[source]
        source: ReadError,
    },
}

/// Failure while reading a temperature from an open link
#[derive(Error, Debug)]
pub enum ReadError {
    /// Bus reset got no presence pulse
    #[error("No presence pulse from sensor")]
    NoPresence,

    /// Conversion never finished within the deadline
    #[error("Temperature conversion timed out")]
    ConversionTimeout,

    /// Scratchpad failed its CRC check
    #[error("Scratchpad CRC mismatch: expected {expected:#04x}, got {actual:#04x}")]
    CrcMismatch { expected: u8, actual: u8 },

    /// Scratchpad came back all zeroes (device dropped off the bus)
    #[error("Empty scratchpad from sensor")]
    EmptyScratchpad,

    /// Serial transport error
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// Raw I/O error on the port
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
