use crate::coordinator::DeviceCoordinator;
use crate::provider::DeviceStateProvider;
use crate::report;
use crate::sensor::AccumulatingEnergySensor;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ENTRY_TITLE: &str = "SmartThings Energy Fix";
pub const ENTRY_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("integration '{0}' is already configured")]
    AlreadyConfigured(String),
    #[error("entry store unavailable: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// A registered integration instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub unique_id: String,
    pub title: String,
    pub version: u32,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
struct EntryDocument {
    #[serde(default)]
    entries: Vec<ConfigEntry>,
}

/// Config entries persisted as a JSON document
pub struct EntryStore {
    path: PathBuf,
}

impl EntryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored entries, empty if the store does not exist yet
    pub async fn entries(&self) -> anyhow::Result<Vec<ConfigEntry>> {
        match tokio::fs::read(&self.path).await {
            Ok(contents) => {
                let document: EntryDocument = serde_json::from_slice(&contents)?;
                Ok(document.entries)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn entry(&self, unique_id: &str) -> anyhow::Result<Option<ConfigEntry>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .find(|entry| entry.unique_id == unique_id))
    }

    async fn save(&self, entries: Vec<ConfigEntry>) -> anyhow::Result<()> {
        let contents = serde_json::to_vec_pretty(&EntryDocument { entries })?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

/// Registers the integration. Only one instance may exist; a second attempt is aborted.
pub async fn register_integration(store: &EntryStore) -> Result<ConfigEntry, SetupError> {
    let mut entries = store.entries().await?;
    if entries.iter().any(|entry| entry.unique_id == crate::DOMAIN) {
        return Err(SetupError::AlreadyConfigured(crate::DOMAIN.to_string()));
    }

    let entry = ConfigEntry {
        unique_id: crate::DOMAIN.to_string(),
        title: ENTRY_TITLE.to_string(),
        version: ENTRY_VERSION,
    };
    entries.push(entry.clone());
    store.save(entries).await?;

    tracing::info!("registered integration '{}'", entry.title);
    Ok(entry)
}

/// A device with broken energy reporting, paired with its accumulating sensor
pub struct TrackedDevice {
    pub coordinator: DeviceCoordinator,
    pub sensor: AccumulatingEnergySensor,
}

/// Finds every device that needs the `deltaEnergy` fix and prepares its coordinator and sensor.
///
/// Each coordinator has completed its first refresh when this returns.
pub async fn setup_entry(
    entry: &ConfigEntry,
    providers: &[Arc<dyn DeviceStateProvider>],
) -> Vec<TrackedDevice> {
    if providers.is_empty() {
        tracing::warn!("No SmartThings source found");
        return Vec::new();
    }

    let mut tracked = Vec::new();

    for provider in providers {
        let devices = match provider.devices().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::debug!("SmartThings source {} has no data yet: {e:#}", provider.name());
                continue;
            }
        };

        for device in devices {
            let Some(report) = report::extract(&device) else {
                continue;
            };

            // Only devices whose energy counter is stuck at zero get a sensor
            if !report::needs_delta_fix(&report) {
                tracing::debug!(
                    "Device {} has working energy={}, skipping",
                    device.device_id,
                    report
                        .get("energy")
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "none".to_string())
                );
                continue;
            }

            let label = device.display_label().to_string();
            tracing::info!(
                entry = %entry.title,
                "Creating accumulating energy sensor for {} ({})",
                label,
                device.device_id
            );

            let mut coordinator =
                DeviceCoordinator::new(Arc::clone(provider), &device.device_id, &label);
            coordinator.first_refresh().await;
            let sensor = AccumulatingEnergySensor::new(&device.device_id, &label);
            tracked.push(TrackedDevice {
                coordinator,
                sensor,
            });
        }
    }

    tracked
}
