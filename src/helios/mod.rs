// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Helios easyControls protocol module
//!
//! Helios KWL ventilation units expose their variables through an ASCII
//! protocol tunneled over Modbus TCP holding registers. This module covers
//! everything needed to talk to one unit:
//!
//! ## Key Components
//!
//! - [`parameter`]: the typed parameter model (`Parameter<T>`, access modes, value kinds)
//! - [`parameters`]: the catalogue of known device variables
//! - [`codec`]: ASCII <-> register packing and answer parsing
//! - [`transport`]: the register-level seam over `tokio-modbus`
//! - [`client`]: `HeliosClient`, turning queries and writes into register traffic
//!
//! ## Usage
//!
//! The client is not meant to be shared. Submit work through the
//! [`crate::queue`] so that a single worker owns the connection:
//!
//! ```no_run
//! use rust_helios::config::DeviceConfig;
//! use rust_helios::helios::{parameters::FAN_LEVEL, HeliosClient};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut client = HeliosClient::connect(&DeviceConfig::default()).await?;
//! let level = client.query(&FAN_LEVEL).await?;
//! println!("Fan level: {:?}", level);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod parameter;
pub mod parameters;
pub mod transport;

pub use client::HeliosClient;
pub use error::HeliosError;
pub use parameter::{AccessMode, Parameter, ParameterInfo, ParameterValue, ValueKind};
