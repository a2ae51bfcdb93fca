// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_helios::config::{self, Config};
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

fn assert_rejected_with_sample(contents: &str) -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    // The sample is itself a valid configuration
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());
    Ok(())
}

#[test]
fn test_type_mismatch_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
device:
  host: 12345
  port: "not-an-integer"
"#,
    )
}

#[test]
fn test_out_of_range_port_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
device:
  host: "helios"
  port: 99999
"#,
    )
}

#[test]
fn test_unknown_section_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
device:
  host: "helios"
  port: 502
visualization:
  port: 8080
"#,
    )
}

#[test]
fn test_unknown_time_zone_creates_sample_file() -> Result<()> {
    // Matches the schema pattern, only the specific rules catch it
    assert_rejected_with_sample(
        r#"
exporter:
  enabled: true
  interval_seconds: 30
  time_zone: "Mars/Olympus_Mons"
"#,
    )
}

#[test]
fn test_invalid_yaml_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "device: [unclosed")?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_config_schema_output() -> Result<()> {
    config::output_config_schema()?;
    Ok(())
}
