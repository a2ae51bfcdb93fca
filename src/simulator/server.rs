// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP front end of the simulated controller
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module
//! uses the terms "server" and "client". The simulator is the server (Modbus
//! slave) and the gateway is the client (Modbus master).

use std::future;

use anyhow::Context;
use log::{error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};
use tokio_util::sync::CancellationToken;

use super::device::{lock, SharedDevice};

/// `tokio-modbus` service exposing the command window of a [`super::SimulatedDevice`].
///
/// Only "read holding registers" and "write multiple registers" are served,
/// and only at the configured register offset.
pub struct HeliosSimulator {
    device: SharedDevice,
    register_offset: u16,
}

impl HeliosSimulator {
    pub fn new(device: SharedDevice, register_offset: u16) -> Self {
        Self {
            device,
            register_offset,
        }
    }
}

impl tokio_modbus::server::Service for HeliosSimulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let res = match req {
            Request::ReadHoldingRegisters(addr, _) | Request::WriteMultipleRegisters(addr, _)
                if addr != self.register_offset =>
            {
                error!("SIMULATOR: Exception::IllegalDataAddress - {addr} is not the command window");
                Err(ExceptionCode::IllegalDataAddress)
            }
            Request::ReadHoldingRegisters(_, cnt) => {
                Ok(Response::ReadHoldingRegisters(lock(&self.device).handle_read(cnt)))
            }
            Request::WriteMultipleRegisters(addr, values) => {
                lock(&self.device).handle_write(&values);
                Ok(Response::WriteMultipleRegisters(addr, values.len() as u16))
            }
            _ => {
                error!("SIMULATOR: Exception::IllegalFunction - Unimplemented function code in request: {req:?}");
                Err(ExceptionCode::IllegalFunction)
            }
        };
        future::ready(res)
    }
}

/// Serve the simulated controller on `listener` until `cancel` fires.
///
/// All connections share the same device state.
pub async fn serve(
    listener: TcpListener,
    device: SharedDevice,
    register_offset: u16,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    info!("Helios simulator listening on {}", listener.local_addr()?);
    let server = Server::new(listener);

    let on_connected = move |stream, socket_addr| {
        let device = device.clone();
        async move {
            accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                Ok(Some(HeliosSimulator::new(device.clone(), register_offset)))
            })
        }
    };

    let on_process_error = |err| {
        error!("Helios simulator error: {err}");
    };

    tokio::select! {
        result = server.serve(&on_connected, on_process_error) => {
            result.context("Helios simulator failed")?;
        }
        _ = cancel.cancelled() => {
            info!("Helios simulator stopped");
        }
    }

    Ok(())
}
