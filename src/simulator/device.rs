// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated controller state
//!
//! [`SimulatedDevice`] reproduces the behavior of the easyControls command
//! window: a write of `code` selects the variable answered by the next read, a
//! write of `code=value` stores the value. [`LoopbackTransport`] drives the
//! device in-process, without sockets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::{debug, warn};

use crate::helios::codec::{decode, encode};
use crate::helios::error::{HeliosError, Result};
use crate::helios::parameters;
use crate::helios::transport::RegisterTransport;

/// Device state shared between connections.
pub type SharedDevice = Arc<Mutex<SimulatedDevice>>;

/// In-memory model of a Helios controller.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDevice {
    values: HashMap<String, String>,
    selected: Option<String>,
    commands: Vec<String>,
}

impl SimulatedDevice {
    /// A device without any stored value.
    pub fn new() -> Self {
        Self::default()
    }

    /// A device with plausible readings for the values the exporter polls.
    pub fn with_defaults() -> Self {
        let mut device = Self::new();
        device.set(parameters::DEVICE_CLOCK.code(), "12:00:00");
        device.set(parameters::OUTSIDE_AIR_TEMPERATURE.code(), "8.5");
        device.set(parameters::SUPPLY_AIR_TEMPERATURE.code(), "19.2");
        device.set(parameters::EXHAUST_AIR_TEMPERATURE.code(), "10.1");
        device.set(parameters::EXTRACT_AIR_TEMPERATURE.code(), "21.7");
        device.set(parameters::FAN_LEVEL.code(), "2");
        device.set(parameters::FAN_PERCENTAGE.code(), "50");
        device.set(parameters::OPERATING_MODE.code(), "0");
        device
    }

    /// Wrap into the shared handle used by servers and transports.
    pub fn shared(self) -> SharedDevice {
        Arc::new(Mutex::new(self))
    }

    pub fn set(&mut self, code: &str, value: &str) {
        self.values.insert(code.to_string(), value.to_string());
    }

    pub fn value(&self, code: &str) -> Option<&str> {
        self.values.get(code).map(String::as_str)
    }

    /// Every command received so far, NUL padding removed, oldest first.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Handle a block write to the command window.
    pub fn handle_write(&mut self, registers: &[u16]) {
        let decoded = decode(registers);
        let command = decoded.split('\0').next().unwrap_or_default().to_string();
        debug!("Simulator received {:?}", command);

        match command.split_once('=') {
            Some((code, value)) => {
                self.values.insert(code.to_string(), value.to_string());
                self.selected = None;
            }
            None => self.selected = Some(command.clone()),
        }
        self.commands.push(command);
    }

    /// Answer a read of `count` registers from the command window.
    ///
    /// The answer is `code=value` for the selected variable, or `code=?` when
    /// it holds no value. Answers longer than the window are truncated.
    pub fn handle_read(&self, count: u16) -> Vec<u16> {
        let answer = match &self.selected {
            Some(code) => match self.values.get(code) {
                Some(value) => format!("{code}={value}"),
                None => format!("{code}=?"),
            },
            None => String::new(),
        };

        let mut registers = encode(&answer).unwrap_or_else(|error| {
            warn!("Simulator cannot encode answer: {}", error);
            Vec::new()
        });
        registers.resize(usize::from(count), 0);
        registers
    }
}

/// Lock the shared device, ignoring poisoning.
pub(crate) fn lock(device: &SharedDevice) -> MutexGuard<'_, SimulatedDevice> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process transport talking to a [`SimulatedDevice`].
pub struct LoopbackTransport {
    device: SharedDevice,
    connected: bool,
}

impl LoopbackTransport {
    pub fn new(device: SharedDevice) -> Self {
        Self {
            device,
            connected: true,
        }
    }
}

#[async_trait]
impl RegisterTransport for LoopbackTransport {
    async fn write_registers(&mut self, _slave: u8, _address: u16, data: &[u16]) -> Result<()> {
        if !self.connected {
            return Err(HeliosError::NotConnected);
        }
        lock(&self.device).handle_write(data);
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        _slave: u8,
        _address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        if !self.connected {
            return Err(HeliosError::NotConnected);
        }
        Ok(lock(&self.device).handle_read(count))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }
}
