// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::exporter::{Clock, ExporterState, MetricsExporter, SystemClock};
use crate::health::{HealthRegistry, HealthStatus};
use crate::helios::parameters::validate_catalogue;
use crate::helios::HeliosClient;
use crate::queue::{CommandQueue, CommandReceiver, ProcessorState, QueueWorker};

/// Interval between two heartbeat log lines.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Represents the set of background tasks serving one Helios controller
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    cancel: CancellationToken,
    queue: Option<CommandQueue>,
    processor_state: ProcessorState,
    exporter_state: ExporterState,
    health: HealthRegistry,
    clock: Arc<dyn Clock>,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        let processor_state = ProcessorState::new();
        let exporter_state = ExporterState::new();

        let mut health = HealthRegistry::new();
        health.register(Arc::new(processor_state.clone()));
        health.register(Arc::new(exporter_state.clone()));

        Daemon {
            tasks: Vec::new(),
            cancel: CancellationToken::new(),
            queue: None,
            processor_state,
            exporter_state,
            health,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock used by the exporter.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Connect to the controller and launch all configured tasks
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        validate_catalogue()?;

        info!(
            "Connecting to Helios controller {}:{} (slave {})",
            config.device.host, config.device.port, config.device.slave_address
        );
        let client = HeliosClient::connect(&config.device)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to Helios controller at {}:{}",
                    config.device.host, config.device.port
                )
            })?;

        self.launch_with_client(client, config)
    }

    /// Launch all configured tasks around an already connected client
    pub fn launch_with_client(&mut self, client: HeliosClient, config: &Config) -> Result<()> {
        let (queue, receiver) = CommandQueue::with_capacity(config.queue.capacity);

        self.start_queue_worker(client, receiver);

        if config.exporter.enabled {
            self.start_exporter(config, queue.clone())?;
        }

        self.start_heartbeat();

        self.queue = Some(queue);
        Ok(())
    }

    /// Start the single consumer of the command queue
    fn start_queue_worker(&mut self, client: HeliosClient, receiver: CommandReceiver) {
        debug!("Starting queue worker");

        let worker = QueueWorker::new(
            client,
            receiver,
            self.processor_state.clone(),
            self.cancel.clone(),
        );
        let task = tokio::spawn(async move {
            worker.run().await?;
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Start the periodic poller
    fn start_exporter(&mut self, config: &Config, queue: CommandQueue) -> Result<()> {
        info!(
            "Starting metrics exporter, polling every {}s",
            config.exporter.interval_seconds
        );

        let exporter = MetricsExporter::new(
            queue,
            self.exporter_state.clone(),
            config.exporter.time_zone()?,
            config.exporter.interval(),
            self.cancel.clone(),
        )
        .with_clock(self.clock.clone());

        let task = tokio::spawn(async move {
            exporter.run().await?;
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs health status periodically
    fn start_heartbeat(&mut self) {
        debug!("Starting heartbeat monitor");

        let cancel = self.cancel.clone();
        let health = self.health.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(HEARTBEAT_INTERVAL) => {}
                }

                match health.status() {
                    HealthStatus::Healthy => debug!("Daemon heartbeat: healthy"),
                    HealthStatus::Unhealthy => {
                        for report in health.report() {
                            if report.status == HealthStatus::Unhealthy {
                                warn!(
                                    "Daemon heartbeat: {} unhealthy since {}",
                                    report.name, report.last_update
                                );
                            }
                        }
                    }
                }
            }
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Producer handle on the command queue, once launched
    pub fn queue(&self) -> Option<CommandQueue> {
        self.queue.clone()
    }

    pub fn exporter_state(&self) -> ExporterState {
        self.exporter_state.clone()
    }

    pub fn processor_state(&self) -> ProcessorState {
        self.processor_state.clone()
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Stop all running tasks
    ///
    /// The exporter stops enqueueing and the worker exits once its current
    /// command is done.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.cancel.cancel();
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        Ok(())
    }
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::FixedClock;
    use crate::helios::parameters::FAN_LEVEL;
    use crate::simulator::device::lock;
    use crate::simulator::{LoopbackTransport, SimulatedDevice};
    use chrono::{TimeZone, Utc};

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_daemon_polls_and_serves_commands() {
        let device = SimulatedDevice::with_defaults().shared();
        let client = HeliosClient::new(Box::new(LoopbackTransport::new(device.clone())), 180, 1);

        // 12:00:00 in Zurich on a winter day, matching the simulated device clock
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 11, 0, 0).unwrap();
        let mut daemon = Daemon::new().with_clock(Arc::new(FixedClock::new(now)));
        daemon
            .launch_with_client(client, &Config::default())
            .unwrap();

        let state = daemon.exporter_state();
        wait_until(|| state.snapshot().fan_level == 2).await;

        let queue = daemon.queue().unwrap();
        queue
            .submit(|client| Box::pin(async move { client.write(&FAN_LEVEL, &3).await }))
            .await
            .unwrap()
            .await
            .unwrap();
        assert_eq!(lock(&device).value("v00102"), Some("3"));
        assert_eq!(daemon.health().status(), HealthStatus::Healthy);

        daemon.shutdown();
        daemon.join().await.unwrap();
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn test_disabled_exporter_does_not_poll() {
        let device = SimulatedDevice::with_defaults().shared();
        let client = HeliosClient::new(Box::new(LoopbackTransport::new(device.clone())), 180, 1);

        let mut config = Config::default();
        config.exporter.enabled = false;
        config.queue.capacity = Some(8);

        let mut daemon = Daemon::new();
        daemon.launch_with_client(client, &config).unwrap();
        time::sleep(Duration::from_millis(50)).await;
        assert!(lock(&device).commands().is_empty());

        daemon.shutdown();
        daemon.join().await.unwrap();
    }
}
