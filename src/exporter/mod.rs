// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Metrics exporter
//!
//! Periodically polls the ventilation unit through the command queue and
//! publishes the readings into an [`ExporterState`]. Each cycle:
//!
//! 1. reads the device clock;
//! 2. compares it with local time in the configured time zone and, when the
//!    drift exceeds [`MAX_CLOCK_DRIFT`], writes the corrected time and starts
//!    the next cycle right away;
//! 3. otherwise reads the six exported values, publishing each as it arrives;
//! 4. sleeps for the polling interval.
//!
//! Every device access goes through the queue, so the exporter never competes
//! with other producers on the wire. A transport failure stops the exporter
//! and marks it unhealthy.

pub mod clock;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::helios::parameters::{
    DEVICE_CLOCK, EXHAUST_AIR_TEMPERATURE, EXTRACT_AIR_TEMPERATURE, FAN_LEVEL, FAN_PERCENTAGE,
    OUTSIDE_AIR_TEMPERATURE, SUPPLY_AIR_TEMPERATURE,
};
use crate::helios::parameter::{HeliosValue, Parameter};
use crate::helios::HeliosError;
use crate::queue::{CommandQueue, QueueError};

pub use clock::{clock_drift, parse_device_time, Clock, FixedClock, SystemClock, MAX_CLOCK_DRIFT};
pub use state::{ExporterSnapshot, ExporterState, Gauge};

/// Delay before retrying after an unusable clock reading.
const CLOCK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Periodic poller publishing device readings.
pub struct MetricsExporter {
    queue: CommandQueue,
    state: ExporterState,
    clock: Arc<dyn Clock>,
    time_zone: Tz,
    interval: Duration,
    cancel: CancellationToken,
}

impl MetricsExporter {
    pub fn new(
        queue: CommandQueue,
        state: ExporterState,
        time_zone: Tz,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            state,
            clock: Arc::new(SystemClock),
            time_zone,
            interval,
            cancel,
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Poll until cancelled or until a device operation fails.
    ///
    /// # Errors
    ///
    /// The queue error that stopped the loop. The state is marked unhealthy
    /// before returning it.
    pub async fn run(self) -> Result<(), QueueError> {
        info!(
            "Metrics exporter started, polling every {:?} ({})",
            self.interval, self.time_zone
        );

        match self.poll().await {
            Ok(()) => {
                info!("Metrics exporter stopped");
                Ok(())
            }
            // The worker went away because of shutdown, not because of a failure
            Err(QueueError::Closed | QueueError::Dropped) if self.cancel.is_cancelled() => {
                info!("Metrics exporter stopped");
                Ok(())
            }
            Err(error) => {
                error!("Could not fetch Helios values: {}", error);
                self.state.set_healthy(false);
                Err(error)
            }
        }
    }

    async fn poll(&self) -> Result<(), QueueError> {
        while !self.cancel.is_cancelled() {
            let Some(device_time) = self.read_device_clock().await? else {
                info!("Device clock reading was invalid");
                self.pause(CLOCK_RETRY_DELAY).await;
                continue;
            };

            if self.correct_clock(device_time).await? {
                continue;
            }

            self.read_sensors(device_time).await?;
            self.pause(self.interval).await;
        }

        Ok(())
    }

    async fn read_device_clock(&self) -> Result<Option<NaiveTime>, QueueError> {
        let reading = self
            .queue
            .submit(|client| Box::pin(async move { client.query(&DEVICE_CLOCK).await }))
            .await?
            .await?;

        Ok(reading.and_then(|text| {
            let parsed = parse_device_time(&text);
            if parsed.is_none() {
                warn!("Cannot parse device clock {:?}", text);
            }
            parsed
        }))
    }

    /// Returns `true` when the device clock had to be rewritten.
    async fn correct_clock(&self, device_time: NaiveTime) -> Result<bool, QueueError> {
        let clock = self.clock.clone();
        let time_zone = self.time_zone;

        self.queue
            .submit(move |client| {
                Box::pin(async move {
                    // Local time is taken when the command runs, not when it is queued
                    let local_time = clock.now().with_timezone(&time_zone).time();
                    if clock_drift(local_time, device_time) <= MAX_CLOCK_DRIFT {
                        return Ok::<_, HeliosError>(false);
                    }

                    let corrected = local_time.format("%H:%M:%S").to_string();
                    info!(
                        "Going to fix time of Helios ({}), as it deviated from real time ({})",
                        device_time, corrected
                    );
                    client.write(&DEVICE_CLOCK, &corrected).await?;
                    Ok(true)
                })
            })
            .await?
            .await
    }

    async fn read_sensors(&self, device_time: NaiveTime) -> Result<(), QueueError> {
        let state = self.state.clone();

        self.queue
            .submit(move |client| {
                Box::pin(async move {
                    let outside = client.query(&OUTSIDE_AIR_TEMPERATURE).await?;
                    publish(&OUTSIDE_AIR_TEMPERATURE, outside, |v| state.set_outside(v));

                    let incoming = client.query(&SUPPLY_AIR_TEMPERATURE).await?;
                    publish(&SUPPLY_AIR_TEMPERATURE, incoming, |v| state.set_incoming(v));

                    let exit = client.query(&EXHAUST_AIR_TEMPERATURE).await?;
                    publish(&EXHAUST_AIR_TEMPERATURE, exit, |v| state.set_exit(v));

                    let outgoing = client.query(&EXTRACT_AIR_TEMPERATURE).await?;
                    publish(&EXTRACT_AIR_TEMPERATURE, outgoing, |v| state.set_outgoing(v));

                    let fan_level = client.query(&FAN_LEVEL).await?;
                    publish(&FAN_LEVEL, fan_level, |v| state.set_fan_level(v));

                    let fan_percentage = client.query(&FAN_PERCENTAGE).await?;
                    publish(&FAN_PERCENTAGE, fan_percentage, |v| {
                        state.set_fan_percentage(v / 100.0)
                    });

                    info!(
                        "{} - {:?} / {:?} / {:?} / {:?}",
                        device_time, outside, incoming, exit, outgoing
                    );
                    state.set_healthy(true);
                    Ok::<_, HeliosError>(())
                })
            })
            .await?
            .await
    }

    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}

fn publish<T: HeliosValue>(parameter: &Parameter<T>, reading: Option<T>, store: impl FnOnce(T)) {
    match reading {
        Some(value) => store(value),
        None => warn!(
            "No valid reading for {} ({}), keeping previous value",
            parameter.code(),
            parameter.description()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helios::transport::MockRegisterTransport;
    use crate::helios::HeliosClient;
    use crate::queue::{ProcessorState, QueueWorker};
    use crate::simulator::device::lock;
    use crate::simulator::{LoopbackTransport, SharedDevice, SimulatedDevice};
    use chrono::{TimeZone, Utc};
    use chrono_tz::Europe::Zurich;
    use tokio::task::JoinHandle;

    struct Harness {
        device: SharedDevice,
        state: ExporterState,
        cancel: CancellationToken,
        worker: JoinHandle<Result<(), HeliosError>>,
        exporter: JoinHandle<Result<(), QueueError>>,
    }

    /// Start a worker and an exporter against a simulated device whose clock
    /// reads `device_clock`, with local Zurich time fixed at `local_clock`.
    fn start(device_clock: Option<&str>, local_clock: (u32, u32, u32)) -> Harness {
        let _ = env_logger::builder().is_test(true).try_init();

        let device = match device_clock {
            Some(time) => {
                let mut simulated = SimulatedDevice::with_defaults();
                simulated.set("v00005", time);
                simulated.shared()
            }
            None => SimulatedDevice::new().shared(),
        };

        let client = HeliosClient::new(Box::new(LoopbackTransport::new(device.clone())), 180, 1);
        let (queue, receiver) = CommandQueue::unbounded();
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(
            QueueWorker::new(client, receiver, ProcessorState::new(), cancel.clone()).run(),
        );

        let (hour, minute, second) = local_clock;
        let now = Zurich
            .with_ymd_and_hms(2025, 1, 15, hour, minute, second)
            .unwrap()
            .with_timezone(&Utc);
        let state = ExporterState::new();
        let exporter = tokio::spawn(
            MetricsExporter::new(
                queue,
                state.clone(),
                Zurich,
                Duration::from_secs(3600),
                cancel.clone(),
            )
            .with_clock(Arc::new(FixedClock::new(now)))
            .run(),
        );

        Harness {
            device,
            state,
            cancel,
            worker,
            exporter,
        }
    }

    async fn wait_for_commands(device: &SharedDevice, count: usize) -> Vec<String> {
        for _ in 0..200 {
            let commands = lock(device).commands().to_vec();
            if commands.len() >= count {
                return commands;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("device did not receive {count} commands");
    }

    async fn stop(harness: Harness) {
        harness.cancel.cancel();
        harness.exporter.await.unwrap().unwrap();
        harness.worker.await.unwrap().unwrap();
    }

    const SENSOR_QUERIES: [&str; 6] = ["v00104", "v00105", "v00106", "v00107", "v00102", "v00103"];

    #[tokio::test]
    async fn test_large_drift_corrects_clock_before_reading_sensors() {
        let harness = start(Some("10:00:00"), (10, 5, 30));

        let commands = wait_for_commands(&harness.device, 9).await;
        let mut expected = vec!["v00005", "v00005=10:05:30", "v00005"];
        expected.extend(SENSOR_QUERIES);
        assert_eq!(commands, expected);

        stop(harness).await;
    }

    #[tokio::test]
    async fn test_small_drift_reads_sensors() {
        let harness = start(Some("10:00:00"), (10, 1, 30));

        let commands = wait_for_commands(&harness.device, 7).await;
        let mut expected = vec!["v00005"];
        expected.extend(SENSOR_QUERIES);
        assert_eq!(commands, expected);

        // Give the last publication a moment to land
        tokio::time::sleep(Duration::from_millis(20)).await;
        let snapshot = harness.state.snapshot();
        assert_eq!(snapshot.outside_temp, 8.5);
        assert_eq!(snapshot.incoming_temp, 19.2);
        assert_eq!(snapshot.exit_temp, 10.1);
        assert_eq!(snapshot.outgoing_temp, 21.7);
        assert_eq!(snapshot.fan_level, 2);
        assert_eq!(snapshot.fan_percentage, 0.5);
        assert!(snapshot.is_healthy);

        stop(harness).await;
    }

    #[tokio::test]
    async fn test_drift_across_midnight_is_not_corrected() {
        let harness = start(Some("23:59:30"), (0, 0, 30));

        let commands = wait_for_commands(&harness.device, 7).await;
        assert!(!commands.iter().any(|command| command.contains('=')));

        stop(harness).await;
    }

    #[tokio::test]
    async fn test_invalid_clock_reading_skips_sensors() {
        let harness = start(None, (10, 0, 0));

        wait_for_commands(&harness.device, 1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        // Retry happens after one second; nothing else is queried meanwhile
        assert_eq!(lock(&harness.device).commands(), ["v00005"]);

        stop(harness).await;
    }

    #[tokio::test]
    async fn test_absent_reading_keeps_previous_value() {
        let harness = start(Some("10:00:00"), (10, 0, 0));
        lock(&harness.device).set("v00104", "n/a");
        harness.state.set_outside(3.0);

        wait_for_commands(&harness.device, 7).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snapshot = harness.state.snapshot();
        assert_eq!(snapshot.outside_temp, 3.0);
        assert_eq!(snapshot.incoming_temp, 19.2);

        stop(harness).await;
    }

    #[tokio::test]
    async fn test_transport_failure_marks_exporter_unhealthy() {
        let mut transport = MockRegisterTransport::new();
        transport.expect_is_connected().return_const(true);
        transport
            .expect_write_registers()
            .returning(|_, _, _| Err(HeliosError::Timeout(Duration::from_millis(2000))));
        transport.expect_disconnect().returning(|| Ok(()));

        let client = HeliosClient::new(Box::new(transport), 180, 1);
        let (queue, receiver) = CommandQueue::unbounded();
        let cancel = CancellationToken::new();
        let processor = ProcessorState::new();
        let worker = tokio::spawn(
            QueueWorker::new(client, receiver, processor.clone(), cancel.clone()).run(),
        );

        let state = ExporterState::new();
        let result = MetricsExporter::new(
            queue,
            state.clone(),
            Zurich,
            Duration::from_secs(10),
            cancel,
        )
        .run()
        .await;

        assert!(matches!(result, Err(QueueError::Aborted(_))));
        assert!(!state.is_healthy());
        assert!(worker.await.unwrap().is_err());
        assert!(!processor.is_healthy());
    }
}
