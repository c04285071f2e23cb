use crate::provider::DeviceStateProvider;
use crate::report::{self, PowerConsumptionReport};
use std::sync::Arc;
use std::time::Duration;

/// Default polling period per device
pub const SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Keeps the latest power consumption report of a single device.
///
/// Every refresh replaces the cached report entirely. Any failure on the way
/// (source not ready, device gone, unexpected structure) results in an empty
/// report rather than an error.
pub struct DeviceCoordinator {
    name: String,
    provider: Arc<dyn DeviceStateProvider>,
    device_id: String,
    device_label: String,
    data: PowerConsumptionReport,
}

impl DeviceCoordinator {
    pub fn new(
        provider: Arc<dyn DeviceStateProvider>,
        device_id: impl Into<String>,
        device_label: impl Into<String>,
    ) -> Self {
        let device_id = device_id.into();
        Self {
            name: format!("{}_{}", crate::DOMAIN, device_id),
            provider,
            device_id,
            device_label: device_label.into(),
            data: PowerConsumptionReport::empty(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_label(&self) -> &str {
        &self.device_label
    }

    /// Latest report, empty when the last refresh produced nothing
    pub fn data(&self) -> &PowerConsumptionReport {
        &self.data
    }

    /// Initial refresh, run before the coordinator is handed to a sensor
    pub async fn first_refresh(&mut self) {
        self.refresh().await;
        tracing::debug!(
            coordinator = %self.name,
            has_data = !self.data.is_empty(),
            "first refresh complete"
        );
    }

    /// Re-fetches the device snapshot and publishes the extracted report
    pub async fn refresh(&mut self) -> &PowerConsumptionReport {
        self.data = self.fetch_report().await;
        &self.data
    }

    async fn fetch_report(&self) -> PowerConsumptionReport {
        let snapshot = match self.provider.snapshot(&self.device_id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!(
                    coordinator = %self.name,
                    "device {} is no longer known to {}",
                    self.device_id,
                    self.provider.name()
                );
                return PowerConsumptionReport::empty();
            }
            Err(e) => {
                tracing::debug!(coordinator = %self.name, "device state unavailable: {e:#}");
                return PowerConsumptionReport::empty();
            }
        };

        report::extract(&snapshot).unwrap_or_default()
    }
}
