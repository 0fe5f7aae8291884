// DigiTemp Exporter - Prometheus exporter for serial temperature sensors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # DigiTemp Exporter
//!
//! Prometheus exporter for a single DS18B20 temperature sensor on a
//! serial 1-Wire adapter.
//!
//! ## Overview
//!
//! A sampling loop reads the sensor on a fixed cadence and publishes each
//! reading to the `digitemp_temperature` gauge, which an HTTP endpoint
//! serves for scraping. The loop is built to run unattended for long
//! periods: link failures are never fatal, every failure is answered with
//! a full reconnect on the next tick, and log output is throttled so a
//! broken cable produces one line instead of thousands.
//!
//! The gauge keeps last-successful-reading semantics. It is never reset
//! or marked stale on failure, so a frozen value is the operator's signal
//! that the link is down.
//!
//! ## Components
//!
//! - [`sampler`] - the tick loop driving sample/publish/reconnect
//! - [`connection`] - single-handle link lifecycle (absent or open)
//! - [`throttle`] - log-rate policies (periodic window, change-or-timeout)
//! - [`sensor`] - link driver contract, DS18B20 implementation, test fake
//! - [`metrics`] - the exported gauge and its text encoding
//! - [`server`] - axum routes for `/metrics`, `/health`, `/ready`, `/status`

pub mod connection;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod sampler;
pub mod sensor;
pub mod server;
pub mod throttle;
