// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! The sampling loop
//!
//! One worker, one sensor. Each tick ensures the link is open, attempts a
//! read, publishes the value, and sleeps out the rest of the tick budget
//! so the cadence self-corrects instead of drifting. No failure is fatal:
//! a bad tick costs at most one throttled log line and a reconnect on the
//! next tick. Retry cadence equals sampling cadence.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::connection::ConnectionManager;
use crate::metrics::MetricsSink;
use crate::sensor::{SensorDriver, SensorHandle};
use crate::throttle::{LogEvent, LogThrottle};

/// Sampling configuration
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Time between samples
    pub delay: Duration,

    /// Minimum interval between periodic "current reading" log lines
    pub reading_log_interval: Duration,

    /// Re-emit window for an unchanged failure line
    pub failure_log_repeat: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            reading_log_interval: LogThrottle::DEFAULT_READING_INTERVAL,
            failure_log_repeat: LogThrottle::DEFAULT_FAILURE_REPEAT,
        }
    }
}

/// Counters the status endpoint reads while the loop runs
#[derive(Debug, Default)]
pub struct SamplerState {
    /// Whether the loop is running
    pub running: AtomicBool,
    /// Whether a link handle is currently held
    pub connected: AtomicBool,
    /// Ticks driven so far
    pub ticks: AtomicU64,
    /// Failed open attempts
    pub connect_failures: AtomicU64,
    /// Failed reads on an open link
    pub read_failures: AtomicU64,
}

impl SamplerState {
    /// Ask the loop to stop; takes effect at the next tick boundary.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Drives the sample/publish/reconnect cycle
pub struct Sampler<D: SensorDriver, M: MetricsSink> {
    connection: ConnectionManager<D>,
    sink: M,
    throttle: LogThrottle,
    config: SamplerConfig,
    state: Arc<SamplerState>,
}

impl<D, M> Sampler<D, M>
where
    D: SensorDriver,
    M: MetricsSink,
{
    pub fn new(connection: ConnectionManager<D>, sink: M, config: SamplerConfig) -> Self {
        let throttle = LogThrottle::new(config.reading_log_interval, config.failure_log_repeat);
        Self {
            connection,
            sink,
            throttle,
            config,
            state: Arc::new(SamplerState::default()),
        }
    }

    /// Shared state handle for the status endpoint and for stopping
    pub fn state(&self) -> Arc<SamplerState> {
        Arc::clone(&self.state)
    }

    /// Run until [`SamplerState::stop`] is called.
    pub fn run(&mut self) {
        self.state.running.store(true, Ordering::SeqCst);
        while self.state.running.load(Ordering::SeqCst) {
            let t0 = Instant::now();
            self.tick(t0);
            let budget = remaining_budget(self.config.delay, t0.elapsed());
            if !budget.is_zero() {
                thread::sleep(budget);
            }
        }
    }

    /// One sampling tick at `now`
    pub fn tick(&mut self, now: Instant) {
        self.state.ticks.fetch_add(1, Ordering::Relaxed);

        let handle = match self.connection.ensure_open() {
            Ok(handle) => handle,
            Err(err) => {
                // No read this tick; the next tick retries the open.
                self.state.connected.store(false, Ordering::Relaxed);
                self.state.connect_failures.fetch_add(1, Ordering::Relaxed);
                let message = err.to_string();
                let event = LogEvent::Failure {
                    category: "connect",
                    message: &message,
                };
                if self.throttle.should_emit(event, now) {
                    error!("{message}");
                }
                return;
            }
        };
        self.state.connected.store(true, Ordering::Relaxed);

        match handle.read_temperature() {
            Ok(value) => {
                self.sink.set(value);
                self.throttle.clear_failures();
                if self.throttle.should_emit(LogEvent::Reading, now) {
                    info!("Read {value:+.2} C");
                }
            }
            Err(err) => {
                self.state.read_failures.fetch_add(1, Ordering::Relaxed);
                let message = format!("Failed to read temperature: {err}");
                let event = LogEvent::Failure {
                    category: "read",
                    message: &message,
                };
                if self.throttle.should_emit(event, now) {
                    error!("{message}");
                }
                // Unconditional teardown forces a fresh open next tick.
                self.connection.reset();
                self.state.connected.store(false, Ordering::Relaxed);
            }
        }
    }

    /// Whether a link handle is currently held
    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }
}

/// Sleep budget left in a tick after `elapsed` of work
fn remaining_budget(delay: Duration, elapsed: Duration) -> Duration {
    delay.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::metrics::RecordingSink;
    use crate::sensor::fake::FakeDriver;

    fn sampler_over(driver: FakeDriver, sink: RecordingSink) -> Sampler<FakeDriver, RecordingSink> {
        let connection = ConnectionManager::new(driver, "/dev/fake");
        Sampler::new(connection, sink, SamplerConfig::default())
    }

    #[test]
    fn test_budget_subtracts_elapsed_work() {
        let delay = Duration::from_secs(5);
        assert_eq!(
            remaining_budget(delay, Duration::from_secs(2)),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_budget_never_goes_negative() {
        let delay = Duration::from_secs(5);
        assert_eq!(remaining_budget(delay, delay), Duration::ZERO);
        assert_eq!(
            remaining_budget(delay, Duration::from_secs(7)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_successful_tick_publishes_reading() {
        let driver = FakeDriver::new();
        driver.script_value(21.37);
        let sink = RecordingSink::new();
        let mut sampler = sampler_over(driver, sink.clone());

        sampler.tick(Instant::now());
        assert_eq!(sink.values(), vec![21.37]);
        assert!(sampler.is_connected());
    }

    #[test]
    fn test_read_failure_resets_the_link() {
        let driver = FakeDriver::new();
        driver.script_read(Err(ReadError::NoPresence));
        driver.script_value(21.5);
        let sink = RecordingSink::new();
        let mut sampler = sampler_over(driver.clone(), sink.clone());

        sampler.tick(Instant::now());
        assert!(!sampler.is_connected());
        assert!(sink.last().is_none());

        // The next tick opens fresh and reads again.
        sampler.tick(Instant::now());
        assert!(sampler.is_connected());
        assert_eq!(driver.open_attempts(), 2);
        assert_eq!(sink.last(), Some(21.5));
    }

    #[test]
    fn test_connect_failure_skips_the_read() {
        let driver = FakeDriver::new();
        driver.fail_opens(1);
        driver.script_value(21.5);
        let sink = RecordingSink::new();
        let mut sampler = sampler_over(driver.clone(), sink.clone());

        sampler.tick(Instant::now());
        assert!(sink.last().is_none());
        let state = sampler.state();
        assert_eq!(state.connect_failures.load(Ordering::Relaxed), 1);

        sampler.tick(Instant::now());
        assert_eq!(sink.last(), Some(21.5));
        assert_eq!(state.ticks.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_state_counters_track_failures() {
        let driver = FakeDriver::new();
        driver.fail_opens(2);
        driver.script_read(Err(ReadError::ConversionTimeout));
        let sink = RecordingSink::new();
        let mut sampler = sampler_over(driver, sink);
        let state = sampler.state();

        let now = Instant::now();
        for i in 0..3 {
            sampler.tick(now + Duration::from_secs(i));
        }

        assert_eq!(state.ticks.load(Ordering::Relaxed), 3);
        assert_eq!(state.connect_failures.load(Ordering::Relaxed), 2);
        assert_eq!(state.read_failures.load(Ordering::Relaxed), 1);
        assert!(!state.connected.load(Ordering::Relaxed));
    }

    #[test]
    fn test_run_stops_on_request() {
        let driver = FakeDriver::new();
        for _ in 0..100 {
            driver.script_value(20.0);
        }
        let sink = RecordingSink::new();
        let connection = ConnectionManager::new(driver, "/dev/fake");
        let config = SamplerConfig {
            delay: Duration::from_millis(1),
            ..Default::default()
        };
        let mut sampler = Sampler::new(connection, sink, config);
        let state = sampler.state();

        let worker = thread::spawn(move || sampler.run());
        thread::sleep(Duration::from_millis(20));
        state.stop();
        worker.join().unwrap();
        assert!(state.ticks.load(Ordering::Relaxed) > 0);
    }
}
