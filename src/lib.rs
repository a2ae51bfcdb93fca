// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Helios library
//!
//! Gateway to Helios KWL "easyControls" ventilation units. The controller
//! exposes its variables through an ASCII protocol tunneled over Modbus TCP
//! holding registers; this library encodes that protocol, serializes every
//! device access through a single queue worker, and polls the unit
//! periodically while keeping its clock on time.

pub mod config;
pub mod daemon;
pub mod exporter;
pub mod health;
pub mod helios;
pub mod queue;
pub mod simulator;
