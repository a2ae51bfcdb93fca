// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Wall clock and device clock drift.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

/// Largest tolerated difference between the device clock and local time.
pub const MAX_CLOCK_DRIFT: Duration = Duration::from_secs(120);

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Distance between two times of day, going the short way around midnight.
///
/// `23:59:30` and `00:00:30` are one minute apart.
pub fn clock_drift(local: NaiveTime, device: NaiveTime) -> Duration {
    let millis = local
        .signed_duration_since(device)
        .num_milliseconds()
        .rem_euclid(MILLIS_PER_DAY);
    let shortest = millis.min(MILLIS_PER_DAY - millis);
    Duration::from_millis(shortest.unsigned_abs())
}

/// Parse a device clock reading (`HH:MM:SS`).
pub fn parse_device_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M:%S").ok()
}
