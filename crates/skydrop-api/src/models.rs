// Wire models for the Skydrop cloud API
//
// Every field is optional: the service omits fields freely and the entity
// layer decides defaults. Fields not named here survive in `extra`, so a
// snapshot never loses data the server sent.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Discovery ───────────────────────────────────────────────────────

/// Response of `GET users/get.controller.ids`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ControllerIdsResponse {
    pub controller_ids: Option<Vec<ControllerIdEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ControllerIdEntry {
    pub public_controller_id: Option<String>,
    pub name: Option<String>,
}

/// Response of `GET users/default.controller.id`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DefaultControllerResponse {
    pub controller_id: Option<String>,
    pub name: Option<String>,
}

// ── Configuration ───────────────────────────────────────────────────

/// Response of `GET controllers/{id}/all.config`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AllConfigResponse {
    pub controller_data: Option<ControllerData>,
    pub zones_data: Option<Vec<ZoneData>>,
}

/// Controller-level configuration snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ControllerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Zone-level configuration snapshot.
///
/// `plant` and `sprinkler` are comma-separated lists on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ZoneData {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub zone_num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprinkler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Live state ──────────────────────────────────────────────────────

/// Response of `GET controllers/{id}/water.state`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WaterStateResponse {
    pub success: Option<Value>,
    pub zone_states: Option<Vec<ZoneStateData>>,
}

impl WaterStateResponse {
    /// The zone states, only when `success` is truthy.
    pub fn into_zone_states(self) -> Option<Vec<ZoneStateData>> {
        if self.success.as_ref().is_some_and(is_truthy) {
            self.zone_states
        } else {
            None
        }
    }
}

/// Live watering state of one zone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ZoneStateData {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub zone_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_watering: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_remaining: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Commands and writes ─────────────────────────────────────────────

/// Raw body of a watering command (`water.zone`, `water.stop`).
///
/// The command counts as accepted when the body carries a `success` key,
/// whatever its value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CommandAck(pub Map<String, Value>);

impl CommandAck {
    pub fn is_accepted(&self) -> bool {
        self.0.contains_key("success")
    }
}

/// Body returned by the configuration write endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WriteAck {
    pub success: Option<Value>,
}

impl WriteAck {
    /// `true` when the write was applied synchronously.
    pub fn is_applied(&self) -> bool {
        self.success.as_ref().is_some_and(is_truthy)
    }
}

/// Fields to change on a controller. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ControllerPatch {
    pub fn on(on: bool) -> Self {
        Self {
            on: Some(on),
            ..Self::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Fields to change on a zone. Absent fields are not sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ZonePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl ZonePatch {
    pub fn on(on: bool) -> Self {
        Self {
            on: Some(on),
            ..Self::default()
        }
    }

    pub fn duration(duration: u32) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }
}

// ── OAuth ───────────────────────────────────────────────────────────

/// Response of `POST oauth/token`.
#[derive(Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// JSON truthiness: `false`, `null`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Zone numbers arrive as JSON numbers or numeric strings.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Num(n)) => u32::try_from(n).map(Some).map_err(de::Error::custom),
        Some(Raw::Str(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

/// Minute counts (`duration`, `time_remaining`). Fractions truncate;
/// values that are not a non-negative number decode as absent so one odd
/// entry does not fail the whole response.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Str(String),
        Other(Value),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(n)) => u32::try_from(n).ok(),
        Some(Raw::Float(f)) => truncate_minutes(f),
        Some(Raw::Str(s)) => s.trim().parse::<f64>().ok().and_then(truncate_minutes),
        Some(Raw::Other(_)) | None => None,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn truncate_minutes(f: f64) -> Option<u32> {
    (f.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&f)).then(|| f.trunc() as u32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zone_data_accepts_string_zone_num_and_keeps_extra() {
        let zone: ZoneData = serde_json::from_value(json!({
            "zone_num": "3",
            "on": true,
            "duration": 15,
            "plant": "grass,shrubs",
            "soil": "clay"
        }))
        .unwrap();

        assert_eq!(zone.zone_num, Some(3));
        assert_eq!(zone.on, Some(true));
        assert_eq!(zone.duration, Some(15));
        assert_eq!(zone.extra.get("soil"), Some(&json!("clay")));
    }

    #[test]
    fn zone_state_accepts_numeric_zone_id() {
        let state: ZoneStateData = serde_json::from_value(json!({
            "zone_id": 2,
            "zone_watering": true,
            "time_remaining": 7
        }))
        .unwrap();
        assert_eq!(state.zone_id, Some(2));
        assert_eq!(state.zone_watering, Some(true));
        assert_eq!(state.time_remaining, Some(7));
    }

    #[test]
    fn odd_minute_counts_do_not_fail_the_response() {
        let resp: WaterStateResponse = serde_json::from_value(json!({
            "success": true,
            "zone_states": [
                { "zone_id": 1, "zone_watering": true, "time_remaining": 2.5 },
                { "zone_id": 2, "zone_watering": true, "time_remaining": "4" },
                { "zone_id": 3, "zone_watering": false, "time_remaining": -1 },
                { "zone_id": 4, "zone_watering": false, "time_remaining": "soon" },
                { "zone_id": 5, "zone_watering": false, "time_remaining": true }
            ]
        }))
        .unwrap();

        let remaining: Vec<Option<u32>> = resp
            .into_zone_states()
            .unwrap()
            .iter()
            .map(|s| s.time_remaining)
            .collect();
        assert_eq!(remaining, vec![Some(2), Some(4), None, None, None]);

        let zone: ZoneData = serde_json::from_value(json!({ "zone_num": 1, "duration": 12.9 })).unwrap();
        assert_eq!(zone.duration, Some(12));
    }

    #[test]
    fn null_zone_num_is_absent() {
        let zone: ZoneData = serde_json::from_value(json!({ "zone_num": null })).unwrap();
        assert_eq!(zone.zone_num, None);
    }

    #[test]
    fn command_ack_checks_key_presence_only() {
        let ack: CommandAck = serde_json::from_value(json!({ "success": false })).unwrap();
        assert!(ack.is_accepted());

        let ack: CommandAck = serde_json::from_value(json!({ "error": "busy" })).unwrap();
        assert!(!ack.is_accepted());
    }

    #[test]
    fn write_ack_requires_truthy_success() {
        let ack: WriteAck = serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(ack.is_applied());

        let ack: WriteAck = serde_json::from_value(json!({ "success": false })).unwrap();
        assert!(!ack.is_applied());

        let ack: WriteAck = serde_json::from_value(json!({})).unwrap();
        assert!(!ack.is_applied());
    }

    #[test]
    fn water_state_drops_states_without_success() {
        let resp: WaterStateResponse = serde_json::from_value(json!({
            "success": false,
            "zone_states": [{ "zone_id": 1 }]
        }))
        .unwrap();
        assert!(resp.into_zone_states().is_none());
    }

    #[test]
    fn patches_serialize_only_set_fields() {
        assert_eq!(serde_json::to_value(ZonePatch::duration(12)).unwrap(), json!({ "duration": 12 }));
        assert_eq!(serde_json::to_value(ControllerPatch::on(false)).unwrap(), json!({ "on": false }));
        assert_eq!(
            serde_json::to_value(ControllerPatch::name("Back yard")).unwrap(),
            json!({ "name": "Back yard" })
        );
    }
}
