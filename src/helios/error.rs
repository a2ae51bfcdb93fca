// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error type shared by the codec, the transport and the device client.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to a Helios controller.
///
/// The variants fall in two classes:
///
/// - caller errors ([`HeliosError::AccessDenied`], [`HeliosError::NonAscii`],
///   [`HeliosError::UnknownParameter`], [`HeliosError::InvalidValue`]) are raised
///   before anything touches the wire and only concern the caller;
/// - transport errors ([`HeliosError::NotConnected`], [`HeliosError::Timeout`],
///   [`HeliosError::Io`], [`HeliosError::Modbus`], [`HeliosError::Exception`],
///   [`HeliosError::Panicked`]) mean the connection can no longer be trusted.
///   See [`HeliosError::is_fatal`].
///
/// A response that does not match the request, or a value that does not parse,
/// is not an error: the client reports it as "no value".
#[derive(Debug, Error)]
pub enum HeliosError {
    /// Write attempted on a parameter whose access mode lacks write capability.
    #[error("Cannot write parameter {code} ({description}) as it is not writable")]
    AccessDenied {
        code: &'static str,
        description: &'static str,
    },

    /// The command string cannot be represented in ASCII.
    #[error("Command {0:?} contains non-ASCII characters")]
    NonAscii(String),

    /// No parameter with this code exists in the registry.
    #[error("Unknown parameter code {0}")]
    UnknownParameter(String),

    /// A textual value could not be converted to the parameter's value kind.
    #[error("Value {value:?} is not valid for parameter {code}")]
    InvalidValue { code: &'static str, value: String },

    /// The transport has no live connection.
    #[error("Client is not connected")]
    NotConnected,

    /// A request did not complete within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Socket-level failure (connect, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the Modbus protocol engine.
    #[error("Modbus protocol error: {0}")]
    Modbus(#[from] tokio_modbus::Error),

    /// The controller answered with a Modbus exception.
    #[error("Device answered with exception: {0}")]
    Exception(tokio_modbus::ExceptionCode),

    /// A queued operation panicked while holding the connection.
    #[error("Command panicked: {0}")]
    Panicked(String),
}

impl HeliosError {
    /// Returns `true` for transport-class failures.
    ///
    /// A fatal error stops the queue worker and the exporter loop; recovery is
    /// left to whatever supervises the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HeliosError::NotConnected
                | HeliosError::Timeout(_)
                | HeliosError::Io(_)
                | HeliosError::Modbus(_)
                | HeliosError::Exception(_)
                | HeliosError::Panicked(_)
        )
    }
}

/// Convenience alias used throughout the `helios` module.
pub type Result<T> = std::result::Result<T, HeliosError>;
