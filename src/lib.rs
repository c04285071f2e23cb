//! SmartThings Energy Fix
//!
//! Some SmartThings smart plugs report a cumulative `energy` that is stuck at
//! zero while still filling in `deltaEnergy` for every reporting window. This
//! library polls those devices, sums the deltas into a monotonically
//! increasing total and publishes it as a Home Assistant energy sensor.

pub mod config;
pub mod coordinator;
pub mod device_poller;
pub mod home_assistant;
pub mod integration;
pub mod provider;
pub mod report;
pub mod sensor;
pub mod setup;

/// Integration domain, also the unique id of its single config entry
pub const DOMAIN: &str = "smartthings_energy";

// Re-export commonly used types for easier access
pub use config::Config;
pub use coordinator::DeviceCoordinator;
pub use home_assistant::HomeAssistantAPI;
pub use integration::Integration;
pub use provider::{DeviceSnapshot, DeviceStateProvider, SnapshotFileProvider};
pub use report::{extract, needs_delta_fix, PowerConsumptionReport};
pub use sensor::AccumulatingEnergySensor;
pub use setup::{register_integration, setup_entry, ConfigEntry, EntryStore, SetupError};
