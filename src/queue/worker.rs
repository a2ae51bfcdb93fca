// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Queue worker
//!
//! The worker is the only task that ever touches the [`HeliosClient`]. It runs
//! commands strictly one after another, in enqueue order.
//!
//! Failure policy is fail-fast: the first transport-class error marks the
//! [`ProcessorState`] unhealthy and ends the loop. Nothing reconnects; the
//! health flag is there for whatever supervises the process.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use super::CommandReceiver;
use crate::helios::{HeliosClient, HeliosError};

/// Health of the queue worker, shared with health checks.
#[derive(Debug, Clone)]
pub struct ProcessorState {
    healthy: Arc<AtomicBool>,
    last_update: Arc<AtomicI64>,
}

impl ProcessorState {
    /// New state, healthy.
    pub fn new() -> Self {
        Self {
            healthy: Arc::new(AtomicBool::new(true)),
            last_update: Arc::new(AtomicI64::new(Utc::now().timestamp_millis())),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Set the health flag and refresh the update time.
    pub fn set_healthy(&self, healthy: bool) {
        self.last_update
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Time of the last health change.
    pub fn last_update(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_update.load(Ordering::Relaxed))
            .unwrap_or_default()
    }
}

impl Default for ProcessorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Sole consumer of the command queue.
pub struct QueueWorker {
    client: HeliosClient,
    receiver: CommandReceiver,
    state: ProcessorState,
    cancel: CancellationToken,
}

impl QueueWorker {
    pub fn new(
        client: HeliosClient,
        receiver: CommandReceiver,
        state: ProcessorState,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            receiver,
            state,
            cancel,
        }
    }

    /// Run commands until cancellation, producer shutdown or a fatal error.
    ///
    /// A panicking command counts as fatal ([`HeliosError::Panicked`]).
    ///
    /// A command in progress is always awaited to completion; cancellation is
    /// only observed between commands. The client is disconnected on exit and
    /// commands still queued resolve to [`super::QueueError::Dropped`].
    ///
    /// # Errors
    ///
    /// The transport error that stopped the loop.
    pub async fn run(mut self) -> Result<(), HeliosError> {
        info!("Queue worker started");

        let result = loop {
            let Some(command) = self.receiver.dequeue(&self.cancel).await else {
                info!("Queue worker stopping");
                break Ok(());
            };

            let outcome = AssertUnwindSafe(command(&mut self.client))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(HeliosError::Panicked(panic_message(&*panic)))
                });

            match outcome {
                Ok(()) => {}
                Err(error) if error.is_fatal() => {
                    error!("Could not process Helios command: {}", error);
                    self.state.set_healthy(false);
                    break Err(error);
                }
                Err(error) => warn!("Helios command failed: {}", error),
            }
        };

        self.receiver.close();
        if let Err(error) = self.client.disconnect().await {
            warn!("Error while disconnecting Helios client: {}", error);
        }

        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helios::codec::{decode, encode};
    use crate::helios::parameters::{FAN_LEVEL, OUTSIDE_AIR_TEMPERATURE, SUPPLY_AIR_TEMPERATURE};
    use crate::helios::transport::{MockRegisterTransport, RegisterTransport};
    use crate::queue::{command, CommandQueue, QueueError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Transport answering `code=1` to every query and recording wire traffic.
    struct RecordingTransport {
        log: Arc<Mutex<Vec<String>>>,
        last_request: String,
    }

    #[async_trait]
    impl RegisterTransport for RecordingTransport {
        async fn write_registers(&mut self, _slave: u8, _address: u16, data: &[u16]) -> crate::helios::error::Result<()> {
            let text = decode(data);
            let text = text.trim_end_matches('\0').to_string();
            self.log.lock().unwrap().push(format!("write {text}"));
            self.last_request = text;
            // Give other tasks a chance to interleave if they could
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok(())
        }

        async fn read_holding_registers(
            &mut self,
            _slave: u8,
            _address: u16,
            count: u16,
        ) -> crate::helios::error::Result<Vec<u16>> {
            self.log
                .lock()
                .unwrap()
                .push(format!("read {}", self.last_request));
            let mut registers = encode(&format!("{}=1", self.last_request)).unwrap();
            registers.resize(count as usize, 0);
            Ok(registers)
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn disconnect(&mut self) -> crate::helios::error::Result<()> {
            self.log.lock().unwrap().push("disconnect".to_string());
            Ok(())
        }
    }

    fn recording_client() -> (HeliosClient, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            log: log.clone(),
            last_request: String::new(),
        };
        (HeliosClient::new(Box::new(transport), 180, 1), log)
    }

    #[tokio::test]
    async fn test_commands_run_in_order_without_interleaving() {
        let (client, log) = recording_client();
        let (queue, receiver) = CommandQueue::unbounded();
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(
            QueueWorker::new(client, receiver, ProcessorState::new(), cancel.clone()).run(),
        );

        let first = queue
            .submit(|client| Box::pin(async move { client.query(&OUTSIDE_AIR_TEMPERATURE).await }))
            .await
            .unwrap();
        let second = queue
            .submit(|client| Box::pin(async move { client.query(&SUPPLY_AIR_TEMPERATURE).await }))
            .await
            .unwrap();
        let third = queue
            .submit(|client| Box::pin(async move { client.query(&FAN_LEVEL).await }))
            .await
            .unwrap();

        let (first, second, third) = tokio::join!(first, second, third);
        assert_eq!(first.unwrap(), Some(1.0));
        assert_eq!(second.unwrap(), Some(1.0));
        assert_eq!(third.unwrap(), Some(1));

        cancel.cancel();
        worker.await.unwrap().unwrap();

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "write v00104",
                "read v00104",
                "write v00105",
                "read v00105",
                "write v00102",
                "read v00102",
                "disconnect",
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_producers_never_overlap() {
        let (client, log) = recording_client();
        let (queue, receiver) = CommandQueue::bounded(2);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(
            QueueWorker::new(client, receiver, ProcessorState::new(), cancel.clone()).run(),
        );

        let mut producers = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            producers.push(tokio::spawn(async move {
                for _ in 0..3 {
                    let pending = queue
                        .submit(|client| Box::pin(async move { client.query(&FAN_LEVEL).await }))
                        .await
                        .unwrap();
                    assert_eq!(pending.await.unwrap(), Some(1));
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        cancel.cancel();
        worker.await.unwrap().unwrap();

        let log = log.lock().unwrap().clone();
        // 12 queries, each a write immediately followed by its read
        assert_eq!(log.len(), 12 * 2 + 1);
        for pair in log[..24].chunks(2) {
            assert_eq!(pair[0], "write v00102");
            assert_eq!(pair[1], "read v00102");
        }
    }

    #[tokio::test]
    async fn test_caller_error_keeps_worker_running() {
        let (client, _log) = recording_client();
        let (queue, receiver) = CommandQueue::unbounded();
        let cancel = CancellationToken::new();
        let state = ProcessorState::new();
        let worker = tokio::spawn(
            QueueWorker::new(client, receiver, state.clone(), cancel.clone()).run(),
        );

        let denied = queue
            .submit(|client| {
                Box::pin(async move { client.write(&OUTSIDE_AIR_TEMPERATURE, &1.0).await })
            })
            .await
            .unwrap()
            .await;
        assert!(matches!(
            denied,
            Err(QueueError::Device(HeliosError::AccessDenied { .. }))
        ));

        let level = queue
            .submit(|client| Box::pin(async move { client.query(&FAN_LEVEL).await }))
            .await
            .unwrap()
            .await;
        assert_eq!(level.unwrap(), Some(1));
        assert!(state.is_healthy());

        cancel.cancel();
        worker.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_transport_failure_stops_worker() {
        let mut transport = MockRegisterTransport::new();
        transport.expect_is_connected().return_const(true);
        transport
            .expect_write_registers()
            .times(1)
            .returning(|_, _, _| Err(HeliosError::Timeout(Duration::from_millis(2000))));
        transport.expect_disconnect().times(1).returning(|| Ok(()));

        let client = HeliosClient::new(Box::new(transport), 180, 1);
        let (queue, receiver) = CommandQueue::unbounded();
        let state = ProcessorState::new();

        let failing = queue
            .submit(|client| Box::pin(async move { client.query(&FAN_LEVEL).await }))
            .await
            .unwrap();
        let never_run = queue
            .submit(|client| Box::pin(async move { client.query(&FAN_LEVEL).await }))
            .await
            .unwrap();

        let result = QueueWorker::new(client, receiver, state.clone(), CancellationToken::new())
            .run()
            .await;

        assert!(matches!(result, Err(HeliosError::Timeout(_))));
        assert!(!state.is_healthy());
        assert!(matches!(failing.await, Err(QueueError::Aborted(_))));
        assert!(matches!(never_run.await, Err(QueueError::Dropped)));
        assert!(matches!(
            queue.enqueue(command(|_| Box::pin(async { Ok(()) }))).await,
            Err(QueueError::Closed)
        ));
    }

    fn explode() -> crate::helios::error::Result<()> {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_command_stops_worker_unhealthy() {
        let (client, log) = recording_client();
        let (queue, receiver) = CommandQueue::unbounded();
        let state = ProcessorState::new();

        queue
            .enqueue(command(|_| Box::pin(async { explode() })))
            .await
            .unwrap();
        let never_run = queue
            .submit(|client| Box::pin(async move { client.query(&FAN_LEVEL).await }))
            .await
            .unwrap();

        let result = QueueWorker::new(client, receiver, state.clone(), CancellationToken::new())
            .run()
            .await;

        match result {
            Err(HeliosError::Panicked(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected worker result: {other:?}"),
        }
        assert!(!state.is_healthy());
        assert!(matches!(never_run.await, Err(QueueError::Dropped)));
        assert!(queue.is_closed());
        assert_eq!(log.lock().unwrap().as_slice(), ["disconnect"]);
    }

    #[tokio::test]
    async fn test_cancellation_lets_running_command_finish() {
        let (client, log) = recording_client();
        let (queue, receiver) = CommandQueue::unbounded();
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(
            QueueWorker::new(client, receiver, ProcessorState::new(), cancel.clone()).run(),
        );

        let slow = {
            let cancel = cancel.clone();
            queue
                .submit(move |client| {
                    Box::pin(async move {
                        // Cancellation arrives while this command is in progress
                        cancel.cancel();
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        client.query(&FAN_LEVEL).await
                    })
                })
                .await
                .unwrap()
        };

        assert_eq!(slow.await.unwrap(), Some(1));
        worker.await.unwrap().unwrap();
        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["write v00102", "read v00102", "disconnect"]
        );
    }

    #[test]
    fn test_processor_state_flag() {
        let state = ProcessorState::new();
        assert!(state.is_healthy());

        let before = state.last_update();
        state.set_healthy(false);
        assert!(!state.is_healthy());
        assert!(state.last_update() >= before);
    }
}
