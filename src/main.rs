// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # DigiTemp Exporter
//!
//! Prometheus exporter for DS18B20 serial temperature sensors.
//!
//! ## Usage
//!
//! ```bash
//! # Sample /dev/ttyUSB0 every 5 seconds, serve metrics on port 8000
//! digitemp-exporter
//!
//! # Custom device and cadence
//! digitemp-exporter --device /dev/ttyUSB1 --delay 2.5 --port 9100
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{info, warn};

use digitemp_exporter::connection::ConnectionManager;
use digitemp_exporter::logging;
use digitemp_exporter::metrics::TemperatureGauge;
use digitemp_exporter::sampler::{Sampler, SamplerConfig};
use digitemp_exporter::sensor::Ds18b20Driver;
use digitemp_exporter::server::{self, AppState};

/// DigiTemp Prometheus Exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Sensor device path
    #[arg(short = 's', long, default_value = "/dev/ttyUSB0")]
    device: String,

    /// Delay between samples in seconds
    #[arg(short, long, default_value = "5.0")]
    delay: f64,

    /// Minimum seconds between periodic reading log lines
    #[arg(long, default_value = "1800")]
    reading_log_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init(&args.log_level);

    info!("DigiTemp Exporter v{}", env!("CARGO_PKG_VERSION"));

    let delay = Duration::try_from_secs_f64(args.delay).unwrap_or_else(|_| {
        warn!("Invalid --delay {}, using 5s", args.delay);
        Duration::from_secs(5)
    });
    let config = SamplerConfig {
        delay,
        reading_log_interval: Duration::from_secs(args.reading_log_interval),
        ..Default::default()
    };

    let connection = ConnectionManager::new(Ds18b20Driver::new(), args.device.clone());
    let mut sampler = Sampler::new(connection, TemperatureGauge, config);
    let sampler_state = sampler.state();

    info!("Sampling {} every {:?}", args.device, delay);
    thread::spawn(move || sampler.run());

    let state = Arc::new(AppState {
        sampler: sampler_state,
        device: args.device,
        delay_secs: args.delay,
        start_time: Instant::now(),
    });
    let app = server::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
