use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Records exchanged between a sensor client and a game.
/// The payload is opaque here; only the game interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SensorMessage {
    Register { role: String },
    SensorData { role: String, payload: Value },
}

impl SensorMessage {
    #[must_use]
    pub fn role(&self) -> &str {
        match self {
            Self::Register { role } | Self::SensorData { role, .. } => role,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_the_game_wire_format() {
        let register: SensorMessage =
            serde_json::from_str(r#"{"type":"register","role":"game"}"#).unwrap();
        assert_eq!(register, SensorMessage::Register { role: "game".into() });

        let data = SensorMessage::SensorData {
            role: "sensor".into(),
            payload: json!({"x": 0.25, "y": -1.0}),
        };
        let v: Value = serde_json::to_value(&data).unwrap();
        assert_eq!(v["type"], "sensorData");
        assert_eq!(v["payload"]["x"], 0.25);
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<SensorMessage>(r#"{"type":"ping","role":"x"}"#).is_err());
    }
}
