// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_helios --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Host**: must not be empty
/// - **Port Range**: the device port must be within 1-65535
/// - **Timeout**: must be greater than zero
/// - **Interval**: the exporter interval must be greater than zero
/// - **Time Zone**: must be a known IANA time zone name
/// - **Queue Capacity**: when set, must be greater than zero
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.device.host.trim().is_empty() {
        anyhow::bail!("Device host must not be empty");
    }

    if config.device.port == 0 {
        anyhow::bail!("Invalid port number: {}", config.device.port);
    }

    if config.device.timeout_ms == 0 {
        anyhow::bail!("Device timeout must be greater than zero");
    }

    if config.exporter.interval_seconds == 0 {
        anyhow::bail!("Exporter interval must be greater than zero");
    }

    config.exporter.time_zone()?;

    if config.queue.capacity == Some(0) {
        anyhow::bail!("Queue capacity must be greater than zero when set");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejected_values() {
        let mut config = Config::default();
        config.device.host = "  ".to_string();
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.exporter.time_zone = "Europe/Atlantis".to_string();
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.queue.capacity = Some(0);
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.exporter.interval_seconds = 0;
        assert!(validate_specific_rules(&config).is_err());
    }
}
