// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Metrics exporter configuration

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Configuration of the periodic poller.
///
/// The time zone is used to compute the local time the device clock is
/// compared against and corrected to. Missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Run the exporter as part of the daemon.
    pub enabled: bool,

    /// Pause between two polling cycles, in seconds.
    pub interval_seconds: u64,

    /// IANA time zone name of the installation, e.g. `Europe/Zurich`.
    pub time_zone: String,
}

impl ExporterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Resolve the configured time zone.
    pub fn time_zone(&self) -> Result<Tz> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Unknown time zone {:?}: {}", self.time_zone, e))
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 30,
            time_zone: "Europe/Zurich".to_string(),
        }
    }
}
