// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Command queue
//!
//! The Helios ASCII protocol is a two-step exchange (write the request, read
//! the answer back from the same registers), so two requests must never overlap
//! on the wire. Instead of locking the client, every producer hands deferred
//! operations to a FIFO queue drained by a single [`worker::QueueWorker`].
//!
//! ## Key Components
//!
//! - [`CommandQueue`]: cloneable producer handle (`enqueue`, `submit`)
//! - [`CommandReceiver`]: the single consumer end, owned by the worker
//! - [`PendingResult`]: future resolving to the result of a submitted operation
//!
//! ## Usage
//!
//! ```no_run
//! use rust_helios::helios::parameters::FAN_LEVEL;
//! use rust_helios::queue::CommandQueue;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let (queue, _receiver) = CommandQueue::unbounded();
//! let level = queue
//!     .submit(|client| Box::pin(async move { client.query(&FAN_LEVEL).await }))
//!     .await?
//!     .await?;
//! println!("Fan level: {:?}", level);
//! # Ok(())
//! # }
//! ```

pub mod worker;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use log::debug;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::helios::{HeliosClient, HeliosError};

pub use worker::{ProcessorState, QueueWorker};

/// A deferred device operation, run exactly once by the worker.
///
/// Returning an error flagged by [`HeliosError::is_fatal`] stops the worker.
pub type Command = Box<
    dyn for<'a> FnOnce(&'a mut HeliosClient) -> BoxFuture<'a, Result<(), HeliosError>> + Send,
>;

/// Box a closure into a [`Command`].
pub fn command<F>(operation: F) -> Command
where
    F: for<'a> FnOnce(&'a mut HeliosClient) -> BoxFuture<'a, Result<(), HeliosError>>
        + Send
        + 'static,
{
    Box::new(operation)
}

/// Errors seen by producers.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The worker has stopped and no longer accepts commands.
    #[error("Command queue is closed")]
    Closed,

    /// The command was discarded without running (worker stopped first).
    #[error("Command was dropped before it could run")]
    Dropped,

    /// The command hit a transport failure, which also stopped the worker.
    #[error("Command aborted by transport failure: {0}")]
    Aborted(String),

    /// The device client rejected the operation.
    #[error(transparent)]
    Device(HeliosError),
}

#[derive(Clone)]
enum Sender {
    Bounded(mpsc::Sender<Command>),
    Unbounded(mpsc::UnboundedSender<Command>),
}

enum Receiver {
    Bounded(mpsc::Receiver<Command>),
    Unbounded(mpsc::UnboundedReceiver<Command>),
}

/// Producer handle of the command queue.
#[derive(Clone)]
pub struct CommandQueue {
    sender: Sender,
}

impl CommandQueue {
    /// Create a queue without capacity limit. `enqueue` never waits.
    pub fn unbounded() -> (CommandQueue, CommandReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            CommandQueue {
                sender: Sender::Unbounded(sender),
            },
            CommandReceiver {
                receiver: Receiver::Unbounded(receiver),
            },
        )
    }

    /// Create a queue holding at most `capacity` pending commands.
    ///
    /// When full, `enqueue` waits for room; nothing is ever dropped.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> (CommandQueue, CommandReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            CommandQueue {
                sender: Sender::Bounded(sender),
            },
            CommandReceiver {
                receiver: Receiver::Bounded(receiver),
            },
        )
    }

    /// Create a bounded or unbounded queue.
    pub fn with_capacity(capacity: Option<usize>) -> (CommandQueue, CommandReceiver) {
        match capacity {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    /// Append a command at the tail of the queue.
    ///
    /// # Errors
    ///
    /// [`QueueError::Closed`] once the worker has stopped.
    pub async fn enqueue(&self, command: Command) -> Result<(), QueueError> {
        match &self.sender {
            Sender::Bounded(sender) => sender.send(command).await.map_err(|_| QueueError::Closed),
            Sender::Unbounded(sender) => sender.send(command).map_err(|_| QueueError::Closed),
        }
    }

    /// Queue a typed operation and get a handle on its result.
    ///
    /// Caller errors from the client come back as [`QueueError::Device`] and
    /// leave the worker running. Transport failures come back as
    /// [`QueueError::Aborted`] and stop the worker.
    pub async fn submit<R, F>(&self, operation: F) -> Result<PendingResult<R>, QueueError>
    where
        R: Send + 'static,
        F: for<'a> FnOnce(&'a mut HeliosClient) -> BoxFuture<'a, Result<R, HeliosError>>
            + Send
            + 'static,
    {
        let (reply, receiver) = oneshot::channel();

        self.enqueue(command(move |client| {
            Box::pin(async move {
                match operation(client).await {
                    Ok(value) => {
                        let _ = reply.send(Ok(value));
                        Ok(())
                    }
                    Err(error) if error.is_fatal() => {
                        let _ = reply.send(Err(QueueError::Aborted(error.to_string())));
                        Err(error)
                    }
                    Err(error) => {
                        debug!("Command rejected by client: {}", error);
                        let _ = reply.send(Err(QueueError::Device(error)));
                        Ok(())
                    }
                }
            })
        }))
        .await?;

        Ok(PendingResult { receiver })
    }

    /// Whether the consumer end has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        match &self.sender {
            Sender::Bounded(sender) => sender.is_closed(),
            Sender::Unbounded(sender) => sender.is_closed(),
        }
    }
}

/// Consumer end of the command queue. There is exactly one per queue.
pub struct CommandReceiver {
    receiver: Receiver,
}

impl CommandReceiver {
    /// Wait for the next command.
    ///
    /// Returns `None` when `cancel` fires or every producer is gone; the worker
    /// treats both as a request to stop. Cancellation wins over pending items.
    pub async fn dequeue(&mut self, cancel: &CancellationToken) -> Option<Command> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            command = self.recv() => command,
        }
    }

    /// Refuse further commands. Already queued commands stay available.
    pub fn close(&mut self) {
        match &mut self.receiver {
            Receiver::Bounded(receiver) => receiver.close(),
            Receiver::Unbounded(receiver) => receiver.close(),
        }
    }

    async fn recv(&mut self) -> Option<Command> {
        match &mut self.receiver {
            Receiver::Bounded(receiver) => receiver.recv().await,
            Receiver::Unbounded(receiver) => receiver.recv().await,
        }
    }
}

/// Result of a submitted operation, available once the worker has run it.
///
/// Resolves to [`QueueError::Dropped`] if the command is discarded unrun.
pub struct PendingResult<R> {
    receiver: oneshot::Receiver<Result<R, QueueError>>,
}

impl<R> Future for PendingResult<R> {
    type Output = Result<R, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(QueueError::Dropped)))
    }
}
