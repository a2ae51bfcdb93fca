// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use rust_helios::simulator::{serve, SimulatedDevice};

/// Simulated Helios controller serving the ASCII command window over Modbus TCP
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Port to listen on
    #[clap(long, default_value = "5020")]
    port: u16,

    /// First register of the command window
    #[clap(long, default_value = "1")]
    register_offset: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let listener = TcpListener::bind((args.address.as_str(), args.port)).await?;
    let device = SimulatedDevice::with_defaults().shared();
    let cancel = CancellationToken::new();

    let server = tokio::spawn(serve(
        listener,
        device,
        args.register_offset,
        cancel.clone(),
    ));

    signal::ctrl_c().await?;
    info!("Received shutdown signal, stopping simulator");
    cancel.cancel();
    server.await??;

    Ok(())
}
