// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Helios device client
//!
//! [`HeliosClient`] translates one logical query or write into register
//! traffic on a single connection:
//!
//! - **query**: write the parameter code, then read the answer window back
//!   from the same address;
//! - **write**: write `code=value`, nothing is read back.
//!
//! The client performs no retries and no locking. It must only be driven from
//! one task at a time, which the [`crate::queue`] worker guarantees.

use std::time::Duration;

use log::{debug, info};

use super::codec::{decode, encode, extract_value};
use super::error::{HeliosError, Result};
use super::parameter::{HeliosValue, Parameter, ParameterInfo, ParameterValue};
use super::transport::{ModbusTcpTransport, RegisterTransport};
use crate::config::DeviceConfig;

/// Protocol translator bound to one Helios controller connection.
pub struct HeliosClient {
    transport: Box<dyn RegisterTransport>,
    slave_address: u8,
    register_offset: u16,
}

impl HeliosClient {
    /// Create a client over an existing transport.
    ///
    /// `slave_address` and `register_offset` locate the command window on the
    /// device (180 and 1 on stock easyControls units).
    pub fn new(
        transport: Box<dyn RegisterTransport>,
        slave_address: u8,
        register_offset: u16,
    ) -> Self {
        Self {
            transport,
            slave_address,
            register_offset,
        }
    }

    /// Open a Modbus TCP connection as described by the device configuration.
    pub async fn connect(config: &DeviceConfig) -> Result<Self> {
        let transport = ModbusTcpTransport::connect(
            &config.host,
            config.port,
            Duration::from_millis(config.timeout_ms),
        )
        .await?;

        Ok(Self::new(
            Box::new(transport),
            config.slave_address,
            config.register_offset,
        ))
    }

    /// Whether the underlying connection is established.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Query a typed parameter.
    ///
    /// Returns `Ok(None)` when the answer does not belong to the requested
    /// parameter or its value does not parse; callers decide whether to retry.
    ///
    /// # Errors
    ///
    /// Transport failures, including [`HeliosError::NotConnected`].
    pub async fn query<T: HeliosValue>(&mut self, parameter: &Parameter<T>) -> Result<Option<T>> {
        let text = self
            .query_text(parameter.code(), parameter.register_count())
            .await?;

        Ok(text.and_then(|text| {
            debug!("Converting {:?} of {} to {}", text, parameter.code(), T::KIND);
            T::parse_value(&text)
        }))
    }

    /// Query a parameter looked up at runtime.
    pub async fn query_raw(&mut self, parameter: &ParameterInfo) -> Result<Option<ParameterValue>> {
        let text = self
            .query_text(parameter.code, parameter.register_count)
            .await?;

        Ok(text.and_then(|text| parameter.parse_value(&text)))
    }

    /// Write a typed parameter.
    ///
    /// # Errors
    ///
    /// [`HeliosError::AccessDenied`] for parameters without write access and
    /// [`HeliosError::NotConnected`] without a connection, both before any I/O.
    pub async fn write<T: HeliosValue>(&mut self, parameter: &Parameter<T>, value: &T) -> Result<()> {
        self.write_text(
            parameter.code(),
            parameter.description(),
            parameter.access().can_write(),
            &value.format_value(),
        )
        .await
    }

    /// Write a parameter looked up at runtime.
    ///
    /// # Errors
    ///
    /// Same as [`HeliosClient::write`], plus [`HeliosError::InvalidValue`] when
    /// `value` is not of the parameter's kind.
    pub async fn write_raw(&mut self, parameter: &ParameterInfo, value: &ParameterValue) -> Result<()> {
        if value.kind() != parameter.kind {
            return Err(HeliosError::InvalidValue {
                code: parameter.code,
                value: value.to_string(),
            });
        }

        self.write_text(
            parameter.code,
            parameter.description,
            parameter.access.can_write(),
            &value.to_string(),
        )
        .await
    }

    /// Close the connection.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await
    }

    async fn query_text(&mut self, code: &str, register_count: u16) -> Result<Option<String>> {
        debug!("Querying {}...", code);

        if !self.transport.is_connected() {
            return Err(HeliosError::NotConnected);
        }

        self.send_command(code).await?;
        let registers = self
            .transport
            .read_holding_registers(self.slave_address, self.register_offset, register_count)
            .await?;

        let decoded = decode(&registers);
        debug!("Decoded: {:?}", decoded);

        Ok(extract_value(code, &decoded).map(str::to_string))
    }

    async fn write_text(
        &mut self,
        code: &'static str,
        description: &'static str,
        writable: bool,
        value: &str,
    ) -> Result<()> {
        if !writable {
            return Err(HeliosError::AccessDenied { code, description });
        }

        if !self.transport.is_connected() {
            return Err(HeliosError::NotConnected);
        }

        let command = format!("{code}={value}");
        info!("Going to set: {}", command);
        self.send_command(&command).await
    }

    async fn send_command(&mut self, command: &str) -> Result<()> {
        let registers = encode(command)?;
        self.transport
            .write_registers(self.slave_address, self.register_offset, &registers)
            .await
    }
}
