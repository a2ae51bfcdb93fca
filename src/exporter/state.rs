// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Last published readings of the metrics exporter
//!
//! [`ExporterState`] has a single writer (the exporter's sensor command) and
//! any number of readers. Every field is an independent atomic: readers may see
//! a mix of two consecutive cycles, never a torn value.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug)]
struct Readings {
    outside: AtomicU32,
    incoming: AtomicU32,
    exit: AtomicU32,
    outgoing: AtomicU32,
    fan_level: AtomicU16,
    fan_percentage: AtomicU32,
    healthy: AtomicBool,
    last_update: AtomicI64,
}

/// Shared handle on the exporter readings.
#[derive(Debug, Clone)]
pub struct ExporterState {
    readings: Arc<Readings>,
}

/// Point-in-time copy of the exporter readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExporterSnapshot {
    /// Outside air temperature in °C
    pub outside_temp: f32,
    /// Supply air temperature in °C
    pub incoming_temp: f32,
    /// Exhaust air temperature in °C
    pub exit_temp: f32,
    /// Extract air temperature in °C
    pub outgoing_temp: f32,
    pub fan_level: u16,
    /// Fan speed as a ratio in 0..=1
    pub fan_percentage: f32,
    pub is_healthy: bool,
    pub last_update: DateTime<Utc>,
}

/// One exported gauge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauge {
    pub name: &'static str,
    pub help: &'static str,
    pub value: f64,
}

fn load_f32(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

fn store_f32(cell: &AtomicU32, value: f32) {
    cell.store(value.to_bits(), Ordering::Relaxed);
}

impl ExporterState {
    /// New state: zero readings, healthy.
    pub fn new() -> Self {
        Self {
            readings: Arc::new(Readings {
                outside: AtomicU32::new(0),
                incoming: AtomicU32::new(0),
                exit: AtomicU32::new(0),
                outgoing: AtomicU32::new(0),
                fan_level: AtomicU16::new(0),
                fan_percentage: AtomicU32::new(0),
                healthy: AtomicBool::new(true),
                last_update: AtomicI64::new(Utc::now().timestamp_millis()),
            }),
        }
    }

    pub fn set_outside(&self, value: f32) {
        store_f32(&self.readings.outside, value);
    }

    pub fn set_incoming(&self, value: f32) {
        store_f32(&self.readings.incoming, value);
    }

    pub fn set_exit(&self, value: f32) {
        store_f32(&self.readings.exit, value);
    }

    pub fn set_outgoing(&self, value: f32) {
        store_f32(&self.readings.outgoing, value);
    }

    pub fn set_fan_level(&self, value: u16) {
        self.readings.fan_level.store(value, Ordering::Relaxed);
    }

    /// Store the fan speed ratio (device percentage divided by 100).
    pub fn set_fan_percentage(&self, value: f32) {
        store_f32(&self.readings.fan_percentage, value);
    }

    /// Set the health flag and refresh the update time.
    pub fn set_healthy(&self, healthy: bool) {
        self.readings
            .last_update
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.readings.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.readings.healthy.load(Ordering::Relaxed)
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.readings.last_update.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> ExporterSnapshot {
        ExporterSnapshot {
            outside_temp: load_f32(&self.readings.outside),
            incoming_temp: load_f32(&self.readings.incoming),
            exit_temp: load_f32(&self.readings.exit),
            outgoing_temp: load_f32(&self.readings.outgoing),
            fan_level: self.readings.fan_level.load(Ordering::Relaxed),
            fan_percentage: load_f32(&self.readings.fan_percentage),
            is_healthy: self.is_healthy(),
            last_update: self.last_update(),
        }
    }

    /// The six readings as named gauges, sorted by name.
    pub fn gauges(&self) -> Vec<Gauge> {
        let snapshot = self.snapshot();
        vec![
            Gauge {
                name: "helios_exit_air_temp_celsius",
                help: "Exhaust air temperature",
                value: f64::from(snapshot.exit_temp),
            },
            Gauge {
                name: "helios_fans_level",
                help: "Fan level",
                value: f64::from(snapshot.fan_level),
            },
            Gauge {
                name: "helios_fans_percentage",
                help: "Fan speed ratio",
                value: f64::from(snapshot.fan_percentage),
            },
            Gauge {
                name: "helios_incoming_air_temp_celsius",
                help: "Supply air temperature",
                value: f64::from(snapshot.incoming_temp),
            },
            Gauge {
                name: "helios_outgoing_air_temp_celsius",
                help: "Extract air temperature",
                value: f64::from(snapshot.outgoing_temp),
            },
            Gauge {
                name: "helios_outside_air_temp_celsius",
                help: "Outside air temperature",
                value: f64::from(snapshot.outside_temp),
            },
        ]
    }
}

impl Default for ExporterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_healthy_and_zeroed() {
        let snapshot = ExporterState::new().snapshot();
        assert!(snapshot.is_healthy);
        assert_eq!(snapshot.outside_temp, 0.0);
        assert_eq!(snapshot.fan_level, 0);
    }

    #[test]
    fn test_clones_share_readings() {
        let state = ExporterState::new();
        let reader = state.clone();

        state.set_outside(-4.5);
        state.set_fan_level(3);
        state.set_fan_percentage(0.75);
        state.set_healthy(false);

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.outside_temp, -4.5);
        assert_eq!(snapshot.fan_level, 3);
        assert_eq!(snapshot.fan_percentage, 0.75);
        assert!(!snapshot.is_healthy);
    }

    #[test]
    fn test_gauges_use_exported_names() {
        let state = ExporterState::new();
        state.set_exit(11.0);
        state.set_outgoing(21.5);

        let gauges = state.gauges();
        let names: Vec<_> = gauges.iter().map(|gauge| gauge.name).collect();
        assert_eq!(
            names,
            [
                "helios_exit_air_temp_celsius",
                "helios_fans_level",
                "helios_fans_percentage",
                "helios_incoming_air_temp_celsius",
                "helios_outgoing_air_temp_celsius",
                "helios_outside_air_temp_celsius",
            ]
        );
        assert_eq!(gauges[0].value, 11.0);
        assert_eq!(gauges[4].value, 21.5);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(ExporterState::new().snapshot()).unwrap();
        assert_eq!(json["is_healthy"], true);
        assert!(json.get("fan_percentage").is_some());
    }
}
