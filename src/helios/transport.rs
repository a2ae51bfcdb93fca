// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register transport
//!
//! The device client only needs two Modbus functions: "write multiple
//! registers" (0x10) and "read holding registers" (0x03). [`RegisterTransport`]
//! is the seam between the client and the protocol engine, so the client can be
//! driven by `tokio-modbus` in production and by a mock in tests.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio::time::timeout;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;

use super::error::{HeliosError, Result};

/// Register-level access to a Modbus slave.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegisterTransport: Send {
    /// Write a block of holding registers starting at `address`.
    async fn write_registers(&mut self, slave: u8, address: u16, data: &[u16]) -> Result<()>;

    /// Read `count` holding registers starting at `address`.
    async fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>>;

    /// Whether the underlying connection is established.
    fn is_connected(&self) -> bool;

    /// Close the connection. Further calls fail with [`HeliosError::NotConnected`].
    async fn disconnect(&mut self) -> Result<()>;
}

/// Modbus TCP transport backed by a `tokio-modbus` client context.
///
/// Every request is bounded by `request_timeout`. The context is dropped on
/// [`RegisterTransport::disconnect`]; there is no reconnect.
pub struct ModbusTcpTransport {
    context: Option<Context>,
    peer: SocketAddr,
    request_timeout: Duration,
}

impl ModbusTcpTransport {
    /// Resolve `host:port` and open the TCP connection.
    ///
    /// # Errors
    ///
    /// [`HeliosError::Io`] if the name cannot be resolved or the connection is
    /// refused, [`HeliosError::Timeout`] if it does not complete in time.
    pub async fn connect(host: &str, port: u16, request_timeout: Duration) -> Result<Self> {
        let peer = timeout(request_timeout, tokio::net::lookup_host((host, port)))
            .await
            .map_err(|_| HeliosError::Timeout(request_timeout))??
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("No address found for {host}:{port}"),
                )
            })?;

        info!("Connecting to Helios controller at {}", peer);
        let context = timeout(request_timeout, tcp::connect(peer))
            .await
            .map_err(|_| HeliosError::Timeout(request_timeout))??;

        Ok(Self {
            context: Some(context),
            peer,
            request_timeout,
        })
    }
}

#[async_trait]
impl RegisterTransport for ModbusTcpTransport {
    async fn write_registers(&mut self, slave: u8, address: u16, data: &[u16]) -> Result<()> {
        let request_timeout = self.request_timeout;
        let context = self.context.as_mut().ok_or(HeliosError::NotConnected)?;
        context.set_slave(Slave(slave));

        debug!(
            "Writing {} registers at {} on slave {}",
            data.len(),
            address,
            slave
        );
        timeout(request_timeout, context.write_multiple_registers(address, data))
            .await
            .map_err(|_| HeliosError::Timeout(request_timeout))??
            .map_err(HeliosError::Exception)
    }

    async fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        let request_timeout = self.request_timeout;
        let context = self.context.as_mut().ok_or(HeliosError::NotConnected)?;
        context.set_slave(Slave(slave));

        debug!(
            "Reading {} holding registers at {} on slave {}",
            count, address, slave
        );
        timeout(request_timeout, context.read_holding_registers(address, count))
            .await
            .map_err(|_| HeliosError::Timeout(request_timeout))??
            .map_err(HeliosError::Exception)
    }

    fn is_connected(&self) -> bool {
        self.context.is_some()
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut context) = self.context.take() {
            info!("Disconnecting from Helios controller at {}", self.peer);
            context.disconnect().await?;
        }
        Ok(())
    }
}
