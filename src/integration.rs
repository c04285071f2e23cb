use crate::device_poller::DevicePoller;
use crate::home_assistant::HomeAssistantAPI;
use crate::setup::TrackedDevice;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Running integration: one polling task per tracked device.
pub struct Integration {
    shutdown: watch::Sender<bool>,
    pollers: Vec<JoinHandle<()>>,
}

impl Integration {
    /// Spawns a poller for every tracked device
    pub fn start(
        devices: Vec<TrackedDevice>,
        ha_client: Arc<HomeAssistantAPI>,
        scan_interval: Duration,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);

        let pollers: Vec<_> = devices
            .into_iter()
            .map(|device| {
                DevicePoller::new(device, Arc::clone(&ha_client), scan_interval)
                    .spawn(shutdown_rx.clone())
            })
            .collect();

        tracing::info!("started {} accumulating energy sensor(s)", pollers.len());

        Self { shutdown, pollers }
    }

    pub fn sensor_count(&self) -> usize {
        self.pollers.len()
    }

    /// Stops scheduling further ticks and waits for every poller to exit
    pub async fn unload(self) {
        // Receivers may already be gone if every poller has exited
        let _ = self.shutdown.send(true);
        for poller in self.pollers {
            if let Err(e) = poller.await {
                tracing::error!("poller task failed: {e}");
            }
        }
        tracing::info!("integration unloaded");
    }
}
