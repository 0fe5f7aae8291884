// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! DS18B20 driver over a DS9097-style passive serial adapter
//!
//! The adapter maps UART traffic onto 1-Wire timing: a bus reset is a
//! single `0xF0` byte at 9600 baud (a present sensor shortens the echoed
//! byte with its presence pulse), and each data bit is one byte slot at
//! 115200 baud. Writing `0xFF` is a write-1 slot and doubles as a read
//! slot; the sensor pulls the echo low to answer 0.

use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::{ConnectError, ReadError};
use crate::sensor::{SensorDriver, SensorHandle};

const RESET_BAUD: u32 = 9_600;
const DATA_BAUD: u32 = 115_200;

const CMD_SKIP_ROM: u8 = 0xCC;
const CMD_CONVERT_T: u8 = 0x44;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;

/// A 12-bit conversion takes up to 750ms on the sensor.
const CONVERSION_DEADLINE: Duration = Duration::from_millis(1_000);
const CONVERSION_POLL: Duration = Duration::from_millis(20);

/// Opens DS18B20 links on a serial adapter
#[derive(Debug, Clone)]
pub struct Ds18b20Driver {
    timeout: Duration,
}

impl Ds18b20Driver {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_millis(500),
        }
    }

    /// Use a custom per-byte serial timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for Ds18b20Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for Ds18b20Driver {
    type Handle = Ds18b20;

    fn open(&self, device: &str) -> Result<Ds18b20, ConnectError> {
        let port = serialport::new(device, DATA_BAUD)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()
            .map_err(|source| ConnectError::Open {
                device: device.to_string(),
                source,
            })?;

        let mut link = Ds18b20 { port };
        match link.bus_reset() {
            Ok(true) => Ok(link),
            Ok(false) => Err(ConnectError::NoSensor {
                device: device.to_string(),
            }),
            Err(source) => Err(ConnectError::Probe {
                device: device.to_string(),
                source,
            }),
        }
    }
}

/// An open DS18B20 link
pub struct Ds18b20 {
    port: Box<dyn SerialPort>,
}

impl Ds18b20 {
    /// Issue a bus reset; true if a sensor answered with a presence pulse.
    fn bus_reset(&mut self) -> Result<bool, ReadError> {
        self.port.set_baud_rate(RESET_BAUD)?;
        self.port.clear(ClearBuffer::Input)?;
        self.port.write_all(&[0xF0])?;
        let mut echo = [0u8; 1];
        self.port.read_exact(&mut echo)?;
        self.port.set_baud_rate(DATA_BAUD)?;
        Ok(echo[0] != 0xF0)
    }

    fn reset_with_presence(&mut self) -> Result<(), ReadError> {
        if self.bus_reset()? {
            Ok(())
        } else {
            Err(ReadError::NoPresence)
        }
    }

    /// Run one bit slot; the returned bit is what the bus answered.
    fn transfer_bit(&mut self, bit: bool) -> Result<bool, ReadError> {
        let slot = if bit { 0xFF } else { 0x00 };
        self.port.write_all(&[slot])?;
        let mut echo = [0u8; 1];
        self.port.read_exact(&mut echo)?;
        Ok(echo[0] == 0xFF)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ReadError> {
        for i in 0..8 {
            self.transfer_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, ReadError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.transfer_bit(true)? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    /// Wait out a conversion in progress; the bus reads 0 until it is done.
    fn wait_conversion(&mut self) -> Result<(), ReadError> {
        let deadline = Instant::now() + CONVERSION_DEADLINE;
        loop {
            if self.transfer_bit(true)? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ReadError::ConversionTimeout);
            }
            thread::sleep(CONVERSION_POLL);
        }
    }
}

impl SensorHandle for Ds18b20 {
    fn read_temperature(&mut self) -> Result<f64, ReadError> {
        self.reset_with_presence()?;
        self.write_byte(CMD_SKIP_ROM)?;
        self.write_byte(CMD_CONVERT_T)?;
        self.wait_conversion()?;

        self.reset_with_presence()?;
        self.write_byte(CMD_SKIP_ROM)?;
        self.write_byte(CMD_READ_SCRATCHPAD)?;
        let mut scratchpad = [0u8; 9];
        for slot in scratchpad.iter_mut() {
            *slot = self.read_byte()?;
        }
        decode_scratchpad(&scratchpad)
    }
}

/// Decode a raw scratchpad into degrees Celsius, checking the CRC.
fn decode_scratchpad(scratchpad: &[u8; 9]) -> Result<f64, ReadError> {
    // An unpowered or vanished sensor reads back all zeroes, which would
    // otherwise pass the CRC as a valid 0.00 C.
    if scratchpad.iter().all(|&b| b == 0) {
        return Err(ReadError::EmptyScratchpad);
    }
    let expected = crc8(&scratchpad[..8]);
    if expected != scratchpad[8] {
        return Err(ReadError::CrcMismatch {
            expected,
            actual: scratchpad[8],
        });
    }
    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    Ok(f64::from(raw) / 16.0)
}

/// Dallas/Maxim CRC-8 (polynomial 0x31, reflected)
fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut bits = byte;
        for _ in 0..8 {
            let mix = (crc ^ bits) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            bits >>= 1;
        }
    }
    crc
}
