use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Raw state of one device, as handed over by the upstream device-cloud client
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub device_id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Component -> capability -> attribute tree. Not trusted to have any particular shape.
    #[serde(default)]
    pub status: Value,
}

impl DeviceSnapshot {
    /// Human readable name, falling back to the device id
    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .filter(|label| !label.is_empty())
            .unwrap_or(&self.device_id)
    }
}

/// Source of device snapshots.
///
/// Either call may fail at any time (source not ready yet, device removed, ...);
/// callers treat a failure as "no data" and try again on their next tick.
#[async_trait]
pub trait DeviceStateProvider: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &str;

    /// All devices currently known to the source
    async fn devices(&self) -> anyhow::Result<Vec<DeviceSnapshot>>;

    /// Current snapshot of a single device, `None` if it is no longer known
    async fn snapshot(&self, device_id: &str) -> anyhow::Result<Option<DeviceSnapshot>> {
        let devices = self.devices().await?;
        Ok(devices
            .into_iter()
            .find(|device| device.device_id == device_id))
    }
}

/// Snapshot document as written by the upstream client.
///
/// Device entries are kept as raw JSON so a single malformed entry cannot
/// invalidate the rest of the document.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub devices: Vec<Value>,
}

impl SnapshotDocument {
    /// Every well-formed device entry; malformed ones are skipped
    pub fn snapshots(self) -> Vec<DeviceSnapshot> {
        self.devices
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::debug!("skipping malformed device entry #{index}: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Reads device snapshots from a JSON document kept up to date by the upstream client.
///
/// The file is re-read on every call so that a fresh dump is picked up on the next poll.
pub struct SnapshotFileProvider {
    path: PathBuf,
    name: String,
}

impl SnapshotFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    async fn read_document(&self) -> anyhow::Result<SnapshotDocument> {
        let contents = tokio::fs::read(&self.path).await.map_err(|e| {
            anyhow::anyhow!("snapshot source {} not ready: {e}", self.path.display())
        })?;
        let document = serde_json::from_slice(&contents)?;
        Ok(document)
    }
}

#[async_trait]
impl DeviceStateProvider for SnapshotFileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn devices(&self) -> anyhow::Result<Vec<DeviceSnapshot>> {
        Ok(self.read_document().await?.snapshots())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    const DOCUMENT: &str = r#"
    {
        "devices": [
            {
                "deviceId": "plug-1",
                "label": "Dryer",
                "status": {
                    "main": {
                        "powerConsumptionReport": {
                            "powerConsumption": {
                                "value": { "energy": 0, "deltaEnergy": 7, "end": "t1" }
                            }
                        }
                    }
                }
            },
            { "deviceId": "hub-2" }
        ]
    }
    "#;

    fn write_document(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_snapshot_file_provider_devices() {
        let file = write_document(DOCUMENT);
        let provider = SnapshotFileProvider::new(file.path());

        let devices = assert_ok!(provider.devices().await);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].display_label(), "Dryer");
        assert_eq!(devices[1].display_label(), "hub-2");
        assert_eq!(devices[1].status, Value::Null);
    }

    #[tokio::test]
    async fn test_snapshot_lookup() {
        let file = write_document(DOCUMENT);
        let provider = SnapshotFileProvider::new(file.path());

        let found = assert_ok!(provider.snapshot("plug-1").await);
        assert_eq!(found.map(|d| d.device_id), Some("plug-1".to_string()));

        let missing = assert_ok!(provider.snapshot("removed").await);
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_malformed_entry_does_not_hide_others() {
        let file = write_document(
            r#"
            {
                "devices": [
                    {
                        "deviceId": "plug-1",
                        "label": "Dryer",
                        "status": { "main": {} }
                    },
                    { "deviceId": "hub", "label": 42 },
                    { "label": "no id" },
                    "not an object",
                    { "deviceId": "plug-3", "label": null }
                ]
            }
            "#,
        );
        let provider = SnapshotFileProvider::new(file.path());

        let devices = assert_ok!(provider.devices().await);
        let ids: Vec<_> = devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["plug-1", "plug-3"]);
        assert_eq!(devices[1].display_label(), "plug-3");

        let found = assert_ok!(provider.snapshot("plug-1").await);
        assert_eq!(found.map(|d| d.display_label().to_string()), Some("Dryer".to_string()));
        assert!(assert_ok!(provider.snapshot("hub").await).is_none());
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_file() {
        let provider = SnapshotFileProvider::new("/nonexistent/snapshot.json");
        let error = assert_err!(provider.devices().await);
        assert!(error.to_string().contains("not ready"));

        let file = write_document("{ not json");
        let provider = SnapshotFileProvider::new(file.path());
        assert_err!(provider.snapshot("plug-1").await);
    }
}
