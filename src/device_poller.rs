use crate::home_assistant::{HomeAssistantAPI, StatePayload};
use crate::setup::TrackedDevice;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Polling loop for a single device: refresh the report, accumulate, publish.
///
/// Ticks run strictly one after another and the loop owns both the
/// coordinator and the sensor, so no locking is needed around the
/// accumulator state.
pub struct DevicePoller {
    device: TrackedDevice,
    ha_client: Arc<HomeAssistantAPI>,
    scan_interval: Duration,
    last_value: Option<f64>,
}

impl DevicePoller {
    pub fn new(
        device: TrackedDevice,
        ha_client: Arc<HomeAssistantAPI>,
        scan_interval: Duration,
    ) -> Self {
        Self {
            device,
            ha_client,
            scan_interval,
            last_value: None,
        }
    }

    pub fn device(&self) -> &TrackedDevice {
        &self.device
    }

    /// Last value published by the sensor, `None` while unknown
    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    /// Spawns the polling loop on its own task, until `shutdown` flips to true
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut poller = self;
            poller.run(shutdown).await;
        })
    }

    async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            coordinator = %self.device.coordinator.name(),
            "starting poller for {} every {}s",
            self.device.coordinator.device_label(),
            self.scan_interval.as_secs()
        );

        // The coordinator was refreshed during setup, publish that value right away
        self.publish().await;

        let mut poll_interval = interval(self.scan_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately
        poll_interval.tick().await;

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            coordinator = %self.device.coordinator.name(),
            "poller exiting"
        );
    }

    /// One poll cycle
    pub async fn tick(&mut self) -> Option<f64> {
        self.device.coordinator.refresh().await;
        self.publish().await
    }

    /// Feeds the current report to the sensor and pushes the resulting state to Home Assistant
    async fn publish(&mut self) -> Option<f64> {
        let TrackedDevice { coordinator, sensor } = &mut self.device;
        let report = coordinator.data();
        let value = sensor.observe(report);
        let diagnostics = sensor.extra_state_attributes(report);
        self.last_value = value;

        if !self.ha_client.is_configured() {
            tracing::debug!(
                sensor = %sensor.unique_id(),
                "no Home Assistant connection, value {:?} kWh not published",
                value
            );
            return value;
        }

        let payload = StatePayload::from_sensor(sensor, value, diagnostics.as_ref());
        let entity_id = sensor.entity_id();
        match self.ha_client.publish_state(&entity_id, &payload).await {
            Ok(_) => tracing::debug!("published {entity_id} = {}", payload.state),
            Err(e) => tracing::warn!("Failed to publish {entity_id}: {e:#}"),
        }

        value
    }
}
