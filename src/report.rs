use crate::provider::DeviceSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Component of the SmartThings status tree holding the device's main capabilities
pub const MAIN_COMPONENT: &str = "main";
/// Capability carrying the power consumption report
pub const POWER_CONSUMPTION_REPORT: &str = "powerConsumptionReport";
/// Attribute of [`POWER_CONSUMPTION_REPORT`] whose value is the report itself
pub const POWER_CONSUMPTION: &str = "powerConsumption";

/// A single power consumption report, as published by the device.
///
/// The device cloud does not guarantee the shape of this object, so the raw
/// JSON map is kept and every field is read through a fallible accessor.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerConsumptionReport(Map<String, Value>);

impl PowerConsumptionReport {
    /// An empty report, published whenever no data is available
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw lookup of a report field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Cumulative energy as reported by the device, if it is numeric
    pub fn energy(&self) -> Option<f64> {
        self.get("energy").and_then(Value::as_f64)
    }

    /// Energy consumed in this reporting window in Wh, coerced to 0 when absent or non-numeric
    pub fn delta_energy(&self) -> f64 {
        self.get("deltaEnergy")
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }

    pub fn has_delta_energy(&self) -> bool {
        self.0.contains_key("deltaEnergy")
    }

    pub fn start(&self) -> Option<&str> {
        self.get("start").and_then(Value::as_str)
    }

    /// End of the reporting window. Empty tokens are treated as missing.
    pub fn end(&self) -> Option<&str> {
        self.get("end")
            .and_then(Value::as_str)
            .filter(|end| !end.is_empty())
    }
}

impl From<Map<String, Value>> for PowerConsumptionReport {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for PowerConsumptionReport {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Extracts the power consumption report from a device snapshot.
///
/// Returns `None` when any step of the status tree is missing or has an
/// unexpected shape.
pub fn extract(snapshot: &DeviceSnapshot) -> Option<PowerConsumptionReport> {
    snapshot
        .status
        .get(MAIN_COMPONENT)?
        .get(POWER_CONSUMPTION_REPORT)?
        .get(POWER_CONSUMPTION)?
        .get("value")?
        .as_object()
        .cloned()
        .map(PowerConsumptionReport)
}

/// True if the device reports a zero (or non-numeric) cumulative energy
/// while still carrying a `deltaEnergy` field.
///
/// The delta itself may currently be zero, e.g. while the plug is idle.
pub fn needs_delta_fix(report: &PowerConsumptionReport) -> bool {
    let energy_stuck = match report.get("energy") {
        None => true,
        Some(energy) => energy.as_f64().map_or(true, |energy| energy == 0.0),
    };
    energy_stuck && report.has_delta_energy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(value: Value) -> PowerConsumptionReport {
        PowerConsumptionReport::try_from(value).unwrap()
    }

    fn snapshot(status: Value) -> DeviceSnapshot {
        DeviceSnapshot {
            device_id: "plug-1".to_string(),
            label: Some("Washing machine".to_string()),
            status,
        }
    }

    #[test]
    fn test_extract_report() {
        let snapshot = snapshot(json!({
            "main": {
                "powerConsumptionReport": {
                    "powerConsumption": {
                        "value": {
                            "energy": 0,
                            "deltaEnergy": 12,
                            "start": "2024-01-01T10:00:00Z",
                            "end": "2024-01-01T10:15:00Z"
                        },
                        "timestamp": "2024-01-01T10:15:03Z"
                    }
                }
            }
        }));

        let report = extract(&snapshot).expect("report should be present");
        assert_eq!(report.energy(), Some(0.0));
        assert_eq!(report.delta_energy(), 12.0);
        assert_eq!(report.start(), Some("2024-01-01T10:00:00Z"));
        assert_eq!(report.end(), Some("2024-01-01T10:15:00Z"));
    }

    #[test]
    fn test_extract_missing_structure() {
        assert!(extract(&snapshot(json!({}))).is_none());
        assert!(extract(&snapshot(json!({ "main": {} }))).is_none());
        assert!(extract(&snapshot(json!({ "main": { "powerConsumptionReport": {} } }))).is_none());
        assert!(extract(&snapshot(Value::Null)).is_none());
    }

    #[test]
    fn test_extract_null_or_mistyped_value() {
        let null_value = snapshot(json!({
            "main": { "powerConsumptionReport": { "powerConsumption": { "value": null } } }
        }));
        assert!(extract(&null_value).is_none());

        let string_value = snapshot(json!({
            "main": { "powerConsumptionReport": { "powerConsumption": { "value": "oops" } } }
        }));
        assert!(extract(&string_value).is_none());

        let mistyped_component = snapshot(json!({ "main": [1, 2, 3] }));
        assert!(extract(&mistyped_component).is_none());
    }

    #[test]
    fn test_needs_delta_fix() {
        assert!(needs_delta_fix(&report(
            json!({"energy": 0, "deltaEnergy": 5, "start": "a", "end": "b"})
        )));
        assert!(!needs_delta_fix(&report(
            json!({"energy": 120, "deltaEnergy": 5, "end": "b"})
        )));
        assert!(!needs_delta_fix(&report(json!({"energy": 0}))));
    }

    #[test]
    fn test_needs_delta_fix_idle_and_odd_energy() {
        // Idle device, delta present but zero
        assert!(needs_delta_fix(&report(json!({"energy": 0.0, "deltaEnergy": 0}))));
        // Missing or non-numeric energy counts as stuck
        assert!(needs_delta_fix(&report(json!({"deltaEnergy": 3}))));
        assert!(needs_delta_fix(&report(json!({"energy": "n/a", "deltaEnergy": null}))));
        assert!(!needs_delta_fix(&report(json!({}))));
    }

    #[test]
    fn test_field_coercion() {
        let report = report(json!({"deltaEnergy": "12", "end": "", "start": 5}));
        assert_eq!(report.delta_energy(), 0.0);
        assert_eq!(report.end(), None);
        assert_eq!(report.start(), None);
        assert!(report.has_delta_energy());
    }
}
