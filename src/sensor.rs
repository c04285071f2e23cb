use crate::report::PowerConsumptionReport;
use serde::Serialize;
use serde_json::Value;

pub const ENTITY_NAME: &str = "Energy (accumulated)";
pub const DEVICE_CLASS: &str = "energy";
pub const STATE_CLASS: &str = "total_increasing";
pub const UNIT_OF_MEASUREMENT: &str = "kWh";
pub const SUGGESTED_DISPLAY_PRECISION: u8 = 2;
/// Integration owning the physical devices in the host's device registry
pub const DEVICE_IDENTIFIER_DOMAIN: &str = "smartthings";

/// Diagnostic attributes exposed next to the accumulated value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticAttributes {
    pub source: &'static str,
    pub last_delta_wh: Option<Value>,
    pub report_start: Option<Value>,
    pub report_end: Option<Value>,
    pub accumulated_wh: f64,
}

/// Energy sensor that sums `deltaEnergy` values into a running total.
///
/// The total only ever grows, so the value is suitable for a
/// `total_increasing` energy statistic. It lives in memory only and starts
/// from zero whenever the process restarts.
#[derive(Debug, Clone)]
pub struct AccumulatingEnergySensor {
    unique_id: String,
    device_id: String,
    device_label: String,
    accumulated_wh: f64,
    last_report_end: Option<String>,
}

impl AccumulatingEnergySensor {
    pub fn new(device_id: impl Into<String>, device_label: impl Into<String>) -> Self {
        let device_id = device_id.into();
        Self {
            unique_id: format!("{device_id}_deltaenergy_accumulated"),
            device_id,
            device_label: device_label.into(),
            accumulated_wh: 0.0,
            last_report_end: None,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn name(&self) -> &str {
        ENTITY_NAME
    }

    /// Name shown to users, prefixed with the device label
    pub fn friendly_name(&self) -> String {
        format!("{} {}", self.device_label, ENTITY_NAME)
    }

    /// `(domain, id)` pair linking the entity to its device
    pub fn device_identifier(&self) -> (&'static str, &str) {
        (DEVICE_IDENTIFIER_DOMAIN, &self.device_id)
    }

    /// Entity id used on the Home Assistant side, e.g. `sensor.plug_1_energy_accumulated`.
    ///
    /// Built from the device id, since several plugs may share a label.
    pub fn entity_id(&self) -> String {
        format!("sensor.{}_energy_accumulated", slugify(&self.device_id))
    }

    pub fn accumulated_wh(&self) -> f64 {
        self.accumulated_wh
    }

    pub fn last_report_end(&self) -> Option<&str> {
        self.last_report_end.as_deref()
    }

    /// Applies the coordinator's current report and returns the value in kWh.
    ///
    /// `None` means "unknown": no report has produced any data yet. Once
    /// something has been accumulated the last total is kept while reports are
    /// missing.
    pub fn observe(&mut self, report: &PowerConsumptionReport) -> Option<f64> {
        if report.is_empty() {
            return (self.accumulated_wh > 0.0).then(|| to_kwh(self.accumulated_wh));
        }

        let delta_energy = report.delta_energy();
        if let Some(end) = report.end() {
            // The `end` token guards against counting a cached report twice
            if self.last_report_end.as_deref() != Some(end) && delta_energy > 0.0 {
                self.accumulated_wh += delta_energy;
                self.last_report_end = Some(end.to_string());
                tracing::trace!(
                    sensor = %self.unique_id,
                    delta_wh = delta_energy,
                    accumulated_wh = self.accumulated_wh,
                    "applied report ending {end}"
                );
            }
        }

        if self.accumulated_wh > 0.0 {
            Some(to_kwh(self.accumulated_wh))
        } else {
            Some(0.0)
        }
    }

    /// Diagnostics for the current report, `None` while no report is available
    pub fn extra_state_attributes(
        &self,
        report: &PowerConsumptionReport,
    ) -> Option<DiagnosticAttributes> {
        if report.is_empty() {
            return None;
        }
        Some(DiagnosticAttributes {
            source: "deltaEnergy",
            last_delta_wh: report.get("deltaEnergy").cloned(),
            report_start: report.get("start").cloned(),
            report_end: report.get("end").cloned(),
            accumulated_wh: round3(self.accumulated_wh),
        })
    }
}

fn to_kwh(wh: f64) -> f64 {
    round3(wh / 1000.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Lowercases and replaces every run of non-ASCII-alphanumeric characters with `_`
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_end_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
