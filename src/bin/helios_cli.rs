// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use rust_helios::config::Config;
use rust_helios::helios::parameters::{catalogue, find};
use rust_helios::helios::{HeliosClient, HeliosError, ParameterInfo, ParameterValue};
use rust_helios::queue::{CommandQueue, ProcessorState, QueueWorker};

/// One-shot access to the variables of a Helios ventilation unit
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Configuration file providing the device settings
    #[clap(long)]
    config: Option<PathBuf>,

    /// Helios controller host
    #[clap(long)]
    host: Option<String>,

    /// Helios controller Modbus TCP port
    #[clap(long)]
    port: Option<u16>,

    /// Enable verbose logging (debug level)
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// List the known parameters
    List {
        /// Print the catalogue as JSON
        #[clap(long)]
        json: bool,
    },
    /// Read a parameter, e.g. `get v00104`
    Get { code: String },
    /// Write a parameter, e.g. `set v00102 3`
    Set { code: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level),
    );

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_args(args.host.clone(), args.port, None);

    match args.action {
        Action::List { json } => list(json),
        Action::Get { code } => {
            let parameter = find(&code)?;
            if !parameter.access.can_read() {
                bail!("Parameter {} ({}) is write-only", parameter.code, parameter.description);
            }

            match run_on_device(&config, parameter.clone(), None).await? {
                Some(value) => println!("{} = {}", parameter.code, value),
                None => println!("{} has no valid value", parameter.code),
            }
            Ok(())
        }
        Action::Set { code, value } => {
            let parameter = find(&code)?;
            let value = checked_value(&parameter, &value)?;

            run_on_device(&config, parameter.clone(), Some(value.clone())).await?;
            println!("{} set to {}", parameter.code, value);
            Ok(())
        }
    }
}

fn list(json: bool) -> Result<()> {
    let parameters = catalogue();

    if json {
        println!("{}", serde_json::to_string_pretty(&parameters)?);
        return Ok(());
    }

    for parameter in parameters {
        let range = match (parameter.min, parameter.max) {
            (Some(min), Some(max)) => format!("{min}..={max}"),
            _ => String::new(),
        };
        println!(
            "{}  {:<2}  {:<4}  {:>2}  {:<16}  {}",
            parameter.code,
            parameter.access.to_string(),
            parameter.kind.to_string(),
            parameter.register_count,
            range,
            parameter.description
        );
    }
    Ok(())
}

/// Parse a user value and check it against the parameter's declaration.
fn checked_value(parameter: &ParameterInfo, text: &str) -> Result<ParameterValue> {
    if !parameter.access.can_write() {
        return Err(HeliosError::AccessDenied {
            code: parameter.code,
            description: parameter.description,
        }
        .into());
    }

    let value = parameter
        .parse_value(text)
        .ok_or_else(|| HeliosError::InvalidValue {
            code: parameter.code,
            value: text.to_string(),
        })?;

    if !parameter.is_within_bounds(&value) {
        bail!(
            "Value {} is out of range for {} ({:?}..={:?})",
            value,
            parameter.code,
            parameter.min,
            parameter.max
        );
    }

    Ok(value)
}

/// Query (`value` is `None`) or write a parameter through the command queue.
async fn run_on_device(
    config: &Config,
    parameter: ParameterInfo,
    value: Option<ParameterValue>,
) -> Result<Option<ParameterValue>> {
    let client = HeliosClient::connect(&config.device)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to Helios controller at {}:{}",
                config.device.host, config.device.port
            )
        })?;

    let (queue, receiver) = CommandQueue::unbounded();
    let cancel = CancellationToken::new();
    let worker = tokio::spawn(
        QueueWorker::new(client, receiver, ProcessorState::new(), cancel.clone()).run(),
    );

    let pending = queue
        .submit(move |client| {
            Box::pin(async move {
                match value {
                    Some(value) => {
                        client.write_raw(&parameter, &value).await?;
                        Ok::<_, HeliosError>(None)
                    }
                    None => client.query_raw(&parameter).await,
                }
            })
        })
        .await?;
    let result = pending.await;

    cancel.cancel();
    if let Err(e) = worker.await? {
        log::debug!("Queue worker stopped with: {}", e);
    }

    Ok(result?)
}
