use crate::sensor::{
    AccumulatingEnergySensor, DiagnosticAttributes, DEVICE_CLASS, STATE_CLASS,
    SUGGESTED_DISPLAY_PRECISION, UNIT_OF_MEASUREMENT,
};
use serde_derive::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// State reported while the sensor has no value yet
pub const UNKNOWN_STATE: &str = "unknown";

pub struct HomeAssistantAPI {
    endpoint_url: String,
    auth_token: String,
    client: reqwest::Client,
}

impl HomeAssistantAPI {
    pub fn new(endpoint_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into().trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// True when an endpoint has been configured
    pub fn is_configured(&self) -> bool {
        !self.endpoint_url.is_empty()
    }

    /// Creates or updates the state of an entity
    pub async fn publish_state(
        &self,
        entity_id: &str,
        payload: &StatePayload,
    ) -> Result<HASensor, anyhow::Error> {
        if !self.is_configured() {
            anyhow::bail!("No HA connection");
        }
        let result = self
            .client
            .post(format!("{}/api/states/{}", self.endpoint_url, entity_id))
            .bearer_auth(&self.auth_token)
            .json(payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(result)
    }
}

/// Body of `POST /api/states/<entity_id>`
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    pub state: String,
    pub attributes: Map<String, Value>,
}

impl StatePayload {
    /// Builds the entity state from the sensor's classification, value and diagnostics
    pub fn from_sensor(
        sensor: &AccumulatingEnergySensor,
        value: Option<f64>,
        diagnostics: Option<&DiagnosticAttributes>,
    ) -> Self {
        let mut attributes = Map::new();
        attributes.insert("friendly_name".into(), json!(sensor.friendly_name()));
        attributes.insert("device_class".into(), json!(DEVICE_CLASS));
        attributes.insert("state_class".into(), json!(STATE_CLASS));
        attributes.insert("unit_of_measurement".into(), json!(UNIT_OF_MEASUREMENT));
        attributes.insert(
            "suggested_display_precision".into(),
            json!(SUGGESTED_DISPLAY_PRECISION),
        );
        attributes.insert("unique_id".into(), json!(sensor.unique_id()));
        let (domain, device_id) = sensor.device_identifier();
        attributes.insert("device_identifiers".into(), json!([[domain, device_id]]));

        if let Some(diagnostics) = diagnostics {
            if let Ok(Value::Object(extra)) = serde_json::to_value(diagnostics) {
                attributes.extend(extra);
            }
        }

        let state = value.map_or_else(|| UNKNOWN_STATE.to_string(), |kwh| kwh.to_string());
        Self { state, attributes }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HASensor {
    #[serde(default)]
    pub entity_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub last_changed: String,
    #[serde(default)]
    pub last_reported: String,
    #[serde(default)]
    pub last_updated: String,
}
