// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics
//!
//! One gauge, last-successful-reading semantics: it is never reset or
//! marked stale on failure, it holds the most recent valid value until
//! the next successful read overwrites it. A frozen gauge is the
//! operator's signal that the link is down.

use lazy_static::lazy_static;
use prometheus::{register_gauge, Encoder, Gauge, TextEncoder};
use std::sync::{Arc, Mutex};

lazy_static! {
    /// Last successfully read temperature in degrees Celsius
    pub static ref TEMPERATURE: Gauge = register_gauge!(
        "digitemp_temperature",
        "Temperature sensor reading in degrees Celsius"
    )
    .unwrap();
}

/// Where the sampling loop publishes readings
pub trait MetricsSink {
    /// Record the latest reading; must not fail or block.
    fn set(&self, value: f64);
}

/// Sink backed by the exported `digitemp_temperature` gauge
#[derive(Debug, Default, Clone, Copy)]
pub struct TemperatureGauge;

impl MetricsSink for TemperatureGauge {
    fn set(&self, value: f64) {
        TEMPERATURE.set(value);
    }
}

/// Sink that records every published value, for tests
#[derive(Clone, Default)]
pub struct RecordingSink {
    values: Arc<Mutex<Vec<f64>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every value published so far, oldest first
    pub fn values(&self) -> Vec<f64> {
        self.values.lock().unwrap().clone()
    }

    /// The current gauge value, if anything was ever published
    pub fn last(&self) -> Option<f64> {
        self.values.lock().unwrap().last().copied()
    }
}

impl MetricsSink for RecordingSink {
    fn set(&self, value: f64) {
        self.values.lock().unwrap().push(value);
    }
}

/// Encode all registered metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_encodes_last_reading() {
        TemperatureGauge.set(21.5);
        let output = encode_metrics();
        assert!(output.contains("digitemp_temperature 21.5"));
        assert!(output.contains("Temperature sensor reading in degrees Celsius"));
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        assert!(sink.last().is_none());
        sink.set(1.0);
        sink.set(-2.5);
        assert_eq!(sink.values(), vec![1.0, -2.5]);
        assert_eq!(sink.last(), Some(-2.5));
    }
}
