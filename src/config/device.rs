// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Helios controller connection configuration
//!
//! This module defines where the ventilation unit is reached and where its
//! ASCII command window lives in the Modbus register space.

use serde::{Deserialize, Serialize};

/// Configuration of the Modbus TCP connection to the Helios controller.
///
/// # Fields
///
/// * `host` - Host name or address of the controller (default: `helios`)
/// * `port` - Modbus TCP port (default: 502)
/// * `timeout_ms` - Per-request timeout in milliseconds (default: 2000)
/// * `slave_address` - Modbus unit identifier (default: 180)
/// * `register_offset` - First register of the command window (default: 1)
///
/// # Example
///
/// ```
/// use rust_helios::config::DeviceConfig;
///
/// let device = DeviceConfig {
///     host: "192.168.1.50".to_string(),
///     ..DeviceConfig::default()
/// };
/// assert_eq!(device.slave_address, 180);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Host name or IP address of the controller.
    pub host: String,

    /// The TCP port the controller listens on.
    ///
    /// Valid range is 1-65535. Default value is 502, the standard Modbus TCP port.
    pub port: u16,

    /// Timeout applied to connecting and to every register request, in milliseconds.
    pub timeout_ms: u64,

    /// Modbus unit identifier of the controller.
    ///
    /// easyControls units answer on 180 regardless of their IP settings.
    pub slave_address: u8,

    /// Register address where commands are written and answers are read back.
    pub register_offset: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "helios".to_string(),
            port: 502,
            timeout_ms: 2000,
            slave_address: 180,
            register_offset: 1,
        }
    }
}
