// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Helios controller simulator
//!
//! A stand-in for a real KWL unit, used by the integration tests and by the
//! `helios_simulator` binary.
//!
//! ## Key Components
//!
//! - [`SimulatedDevice`]: variable store and command window logic
//! - [`HeliosSimulator`]: `tokio-modbus` server service over a shared device
//! - [`LoopbackTransport`]: in-process transport, no sockets involved
//!
//! ## Usage
//!
//! ```no_run
//! use rust_helios::simulator::{serve, SimulatedDevice};
//! use tokio::net::TcpListener;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:5020").await?;
//! let device = SimulatedDevice::with_defaults().shared();
//! serve(listener, device, 1, CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod server;

pub use device::{LoopbackTransport, SharedDevice, SimulatedDevice};
pub use server::{serve, HeliosSimulator};
