// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Catalogue of Helios easyControls device variables
//!
//! Codes, answer sizes and ranges follow the vendor's Modbus documentation for
//! KWL easyControls units. The register count is the length of the answer
//! window in 16-bit registers.

use std::collections::HashSet;

use super::error::{HeliosError, Result};
use super::parameter::{AccessMode, Parameter, ParameterInfo};

pub const POST_HEATER_OUTPUT: Parameter<u32> = Parameter::new(
    "v01109",
    9,
    "Output of post-heater in %",
    AccessMode::Read,
    Some(0),
    Some(u32::MAX),
);

pub const PRE_HEATER_OUTPUT: Parameter<u32> = Parameter::new(
    "v01108",
    9,
    "Output of pre-heater in %",
    AccessMode::Read,
    Some(0),
    Some(u32::MAX),
);

pub const EXTRACT_FAN_LEVEL: Parameter<u16> = Parameter::new(
    "v01051",
    5,
    "Current extract air fan level",
    AccessMode::ReadWrite,
    Some(0),
    Some(4),
);

pub const EXTRACT_FAN_RPM: Parameter<u16> = Parameter::new(
    "v00349",
    6,
    "Extract air fan speed in rpm",
    AccessMode::Read,
    Some(0),
    Some(9999),
);

pub const EXTRACT_AIR_TEMPERATURE: Parameter<f32> = Parameter::new(
    "v00107",
    8,
    "Temperature: extract air",
    AccessMode::Read,
    Some(-27.0),
    Some(9999.0),
);

pub const OUTSIDE_AIR_TEMPERATURE: Parameter<f32> = Parameter::new(
    "v00104",
    8,
    "Temperature: outside air",
    AccessMode::Read,
    Some(-27.0),
    Some(9999.0),
);

pub const COMFORT_TEMPERATURE: Parameter<f32> = Parameter::new(
    "v00043",
    8,
    "Temperature: comfort",
    AccessMode::Read,
    Some(10.0),
    Some(25.0),
);

pub const OPERATING_MODE: Parameter<u16> = Parameter::new(
    "v00101",
    5,
    "0 = auto, 1 = manual",
    AccessMode::ReadWrite,
    Some(0),
    Some(1),
);

pub const EXTRACT_FAN_OPERATING_MINUTES: Parameter<u32> = Parameter::new(
    "v01104",
    9,
    "Operating time of extract air fan in minutes",
    AccessMode::Read,
    Some(0),
    Some(u32::MAX),
);

pub const POST_HEATER_OPERATING_MINUTES: Parameter<u32> = Parameter::new(
    "v01106",
    9,
    "Operating time of post-heater in minutes",
    AccessMode::Read,
    Some(0),
    Some(u32::MAX),
);

pub const PRE_HEATER_OPERATING_MINUTES: Parameter<u32> = Parameter::new(
    "v01105",
    9,
    "Operating time of pre-heater in minutes",
    AccessMode::Read,
    Some(0),
    Some(u32::MAX),
);

pub const SUPPLY_FAN_OPERATING_MINUTES: Parameter<u32> = Parameter::new(
    "v01103",
    9,
    "Operating time of supply air fan in minutes",
    AccessMode::Read,
    Some(0),
    Some(u32::MAX),
);

pub const BYPASS_MIN_OUTSIDE_TEMPERATURE: Parameter<u16> = Parameter::new(
    "v01036",
    5,
    "Bypass minimum outside temperature in degrees Celsius",
    AccessMode::ReadWrite,
    Some(5),
    Some(20),
);

pub const BYPASS_ROOM_TEMPERATURE: Parameter<u16> = Parameter::new(
    "v01035",
    5,
    "Bypass room temperature in degrees Celsius",
    AccessMode::ReadWrite,
    Some(10),
    Some(40),
);

pub const EXHAUST_AIR_TEMPERATURE: Parameter<f32> = Parameter::new(
    "v00106",
    8,
    "Temperature: exhaust air",
    AccessMode::Read,
    Some(-27.0),
    Some(9999.0),
);

pub const FAN_LEVEL: Parameter<u16> = Parameter::new(
    "v00102",
    5,
    "Current fan level",
    AccessMode::ReadWrite,
    Some(0),
    Some(4),
);

pub const MIN_FAN_LEVEL: Parameter<u16> = Parameter::new(
    "v00020",
    6,
    "Minimum fan level",
    AccessMode::ReadWrite,
    Some(0),
    Some(1),
);

pub const PARTY_MODE: Parameter<u16> = Parameter::new(
    "v00094",
    5,
    "Party mode 0 = off, 1 = on",
    AccessMode::ReadWrite,
    Some(0),
    Some(1),
);

pub const PARTY_DURATION: Parameter<u16> = Parameter::new(
    "v00091",
    6,
    "Party mode duration in minutes",
    AccessMode::ReadWrite,
    Some(5),
    Some(180),
);

pub const PARTY_FAN_LEVEL: Parameter<u16> = Parameter::new(
    "v00092",
    5,
    "Party mode fan level",
    AccessMode::ReadWrite,
    Some(0),
    Some(4),
);

pub const PARTY_REMAINING_MINUTES: Parameter<u16> = Parameter::new(
    "v00093",
    6,
    "Party mode remaining time in minutes",
    AccessMode::Read,
    Some(0),
    Some(180),
);

pub const FAN_PERCENTAGE: Parameter<f32> = Parameter::new(
    "v00103",
    6,
    "Current fan level in percent",
    AccessMode::Read,
    Some(0.0),
    Some(100.0),
);

pub const FILTER_REMAINING_MINUTES: Parameter<u32> = Parameter::new(
    "v01033",
    9,
    "Remaining time until filter change in minutes",
    AccessMode::Read,
    Some(0),
    Some(u32::MAX),
);

pub const QUIET_MODE: Parameter<u16> = Parameter::new(
    "v00099",
    5,
    "Quiet mode 0 = off, 1 = on",
    AccessMode::ReadWrite,
    Some(0),
    Some(1),
);

pub const QUIET_DURATION: Parameter<u16> = Parameter::new(
    "v00096",
    6,
    "Quiet mode duration in minutes",
    AccessMode::ReadWrite,
    Some(5),
    Some(180),
);

pub const QUIET_FAN_LEVEL: Parameter<u16> = Parameter::new(
    "v00097",
    5,
    "Quiet mode fan level",
    AccessMode::ReadWrite,
    Some(0),
    Some(4),
);

pub const QUIET_REMAINING_MINUTES: Parameter<u16> = Parameter::new(
    "v00098",
    6,
    "Quiet mode remaining time in minutes",
    AccessMode::Read,
    Some(0),
    Some(180),
);

pub const EXTRACT_VOLTAGE_LEVEL_1: Parameter<f32> = Parameter::new(
    "v00012",
    6,
    "Fan voltage level 1: extract air",
    AccessMode::ReadWrite,
    Some(1.6),
    Some(10.0),
);

pub const EXTRACT_VOLTAGE_LEVEL_2: Parameter<f32> = Parameter::new(
    "v00014",
    6,
    "Fan voltage level 2: extract air",
    AccessMode::ReadWrite,
    Some(1.6),
    Some(10.0),
);

pub const EXTRACT_VOLTAGE_LEVEL_3: Parameter<f32> = Parameter::new(
    "v00016",
    6,
    "Fan voltage level 3: extract air",
    AccessMode::ReadWrite,
    Some(1.6),
    Some(10.0),
);

pub const EXTRACT_VOLTAGE_LEVEL_4: Parameter<f32> = Parameter::new(
    "v00018",
    6,
    "Fan voltage level 4: extract air",
    AccessMode::ReadWrite,
    Some(1.6),
    Some(10.0),
);

pub const SUPPLY_VOLTAGE_LEVEL_1: Parameter<f32> = Parameter::new(
    "v00013",
    6,
    "Fan voltage level 1: supply air",
    AccessMode::ReadWrite,
    Some(1.6),
    Some(10.0),
);

pub const SUPPLY_VOLTAGE_LEVEL_2: Parameter<f32> = Parameter::new(
    "v00015",
    6,
    "Fan voltage level 2: supply air",
    AccessMode::ReadWrite,
    Some(1.6),
    Some(10.0),
);

pub const SUPPLY_VOLTAGE_LEVEL_3: Parameter<f32> = Parameter::new(
    "v00017",
    6,
    "Fan voltage level 3: supply air",
    AccessMode::ReadWrite,
    Some(1.6),
    Some(10.0),
);

pub const SUPPLY_VOLTAGE_LEVEL_4: Parameter<f32> = Parameter::new(
    "v00019",
    6,
    "Fan voltage level 4: supply air",
    AccessMode::ReadWrite,
    Some(1.6),
    Some(10.0),
);

/// Device clock, formatted `hh:mm:ss`.
pub const DEVICE_CLOCK: Parameter<String> = Parameter::new(
    "v00005",
    9,
    "hh:mm:ss",
    AccessMode::ReadWrite,
    None,
    None,
);

pub const PRE_HEATER_STATUS: Parameter<u16> = Parameter::new(
    "v00024",
    5,
    "Pre-heater 0 = off, 1 = on",
    AccessMode::ReadWrite,
    Some(0),
    Some(1),
);

pub const FILTER_CHANGE_INTERVAL: Parameter<u16> = Parameter::new(
    "v01032",
    5,
    "Filter change interval in months",
    AccessMode::ReadWrite,
    Some(0),
    Some(12),
);

pub const SUPPLY_FAN_LEVEL: Parameter<u16> = Parameter::new(
    "v01050",
    5,
    "Current supply air fan level",
    AccessMode::ReadWrite,
    Some(0),
    Some(4),
);

pub const SUPPLY_FAN_RPM: Parameter<u16> = Parameter::new(
    "v00348",
    6,
    "Supply air fan speed in rpm",
    AccessMode::Read,
    Some(0),
    Some(9999),
);

pub const SUPPLY_AIR_TEMPERATURE: Parameter<f32> = Parameter::new(
    "v00105",
    8,
    "Temperature: supply air",
    AccessMode::Read,
    Some(-27.0),
    Some(9999.0),
);

/// Type-erased views of every declared parameter, sorted by code.
pub fn catalogue() -> Vec<ParameterInfo> {
    let mut all = vec![
        DEVICE_CLOCK.info(),
        EXTRACT_VOLTAGE_LEVEL_1.info(),
        SUPPLY_VOLTAGE_LEVEL_1.info(),
        EXTRACT_VOLTAGE_LEVEL_2.info(),
        SUPPLY_VOLTAGE_LEVEL_2.info(),
        EXTRACT_VOLTAGE_LEVEL_3.info(),
        SUPPLY_VOLTAGE_LEVEL_3.info(),
        EXTRACT_VOLTAGE_LEVEL_4.info(),
        SUPPLY_VOLTAGE_LEVEL_4.info(),
        MIN_FAN_LEVEL.info(),
        PRE_HEATER_STATUS.info(),
        COMFORT_TEMPERATURE.info(),
        PARTY_DURATION.info(),
        PARTY_FAN_LEVEL.info(),
        PARTY_REMAINING_MINUTES.info(),
        PARTY_MODE.info(),
        QUIET_DURATION.info(),
        QUIET_FAN_LEVEL.info(),
        QUIET_REMAINING_MINUTES.info(),
        QUIET_MODE.info(),
        OPERATING_MODE.info(),
        FAN_LEVEL.info(),
        FAN_PERCENTAGE.info(),
        OUTSIDE_AIR_TEMPERATURE.info(),
        SUPPLY_AIR_TEMPERATURE.info(),
        EXHAUST_AIR_TEMPERATURE.info(),
        EXTRACT_AIR_TEMPERATURE.info(),
        SUPPLY_FAN_RPM.info(),
        EXTRACT_FAN_RPM.info(),
        FILTER_CHANGE_INTERVAL.info(),
        FILTER_REMAINING_MINUTES.info(),
        BYPASS_ROOM_TEMPERATURE.info(),
        BYPASS_MIN_OUTSIDE_TEMPERATURE.info(),
        SUPPLY_FAN_LEVEL.info(),
        EXTRACT_FAN_LEVEL.info(),
        SUPPLY_FAN_OPERATING_MINUTES.info(),
        EXTRACT_FAN_OPERATING_MINUTES.info(),
        PRE_HEATER_OPERATING_MINUTES.info(),
        POST_HEATER_OPERATING_MINUTES.info(),
        PRE_HEATER_OUTPUT.info(),
        POST_HEATER_OUTPUT.info(),
    ];
    all.sort_by_key(|info| info.code);
    all
}

/// Look a parameter up by its code.
pub fn find(code: &str) -> Result<ParameterInfo> {
    catalogue()
        .into_iter()
        .find(|info| info.code == code)
        .ok_or_else(|| HeliosError::UnknownParameter(code.to_string()))
}

/// Check that every code is well formed and unique and that every answer
/// window is non-empty.
pub fn validate_catalogue() -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for info in catalogue() {
        if !info.has_valid_code() {
            anyhow::bail!("Malformed parameter code: {}", info.code);
        }
        if info.register_count == 0 {
            anyhow::bail!("Parameter {} declares an empty answer window", info.code);
        }
        if !seen.insert(info.code) {
            anyhow::bail!("Duplicate parameter code: {}", info.code);
        }
    }
    Ok(())
}
