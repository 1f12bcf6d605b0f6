use serde::{Deserialize, Serialize};

/// Authoritative actuator snapshot as the backend reports it.
///
/// Body of `GET /state` and payload of the push channel's `state_update`
/// event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub led_brightness: i64,
    pub servo_angle: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLedRequest {
    pub brightness: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLedResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub led_brightness: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetServoRequest {
    pub angle: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetServoResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servo_angle: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceRequest {
    pub command: String,
}

/// Interpreter verdict for a free-text command. Absent or null actuator
/// fields mean "unchanged".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceResponse {
    pub response: String,
    #[serde(default)]
    pub led_brightness: Option<i64>,
    #[serde(default)]
    pub servo_angle: Option<i64>,
}

/// Events delivered over the optional push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DeviceEvent {
    StateUpdate(StateSnapshot),
    Connect,
    Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_response_null_fields_mean_unchanged() {
        let parsed: VoiceResponse =
            serde_json::from_str(r#"{"response":"ok","led_brightness":80,"servo_angle":null}"#)
                .expect("parse");
        assert_eq!(parsed.led_brightness, Some(80));
        assert_eq!(parsed.servo_angle, None);

        let parsed: VoiceResponse =
            serde_json::from_str(r#"{"response":"ok"}"#).expect("parse without actuator fields");
        assert_eq!(parsed.led_brightness, None);
        assert_eq!(parsed.servo_angle, None);
    }

    #[test]
    fn device_events_round_trip_the_wire_tags() {
        let parsed: DeviceEvent = serde_json::from_str(
            r#"{"type":"state_update","payload":{"led_brightness":40,"servo_angle":90}}"#,
        )
        .expect("parse state_update");
        match parsed {
            DeviceEvent::StateUpdate(snapshot) => {
                assert_eq!(snapshot.led_brightness, 40);
                assert_eq!(snapshot.servo_angle, 90);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let parsed: DeviceEvent =
            serde_json::from_str(r#"{"type":"connect"}"#).expect("parse connect");
        assert!(matches!(parsed, DeviceEvent::Connect));

        let parsed: DeviceEvent =
            serde_json::from_str(r#"{"type":"disconnect"}"#).expect("parse disconnect");
        assert!(matches!(parsed, DeviceEvent::Disconnect));
    }

    #[test]
    fn set_led_response_tolerates_missing_echo() {
        let parsed: SetLedResponse = serde_json::from_str(r#"{"ok":true}"#).expect("parse");
        assert!(parsed.ok);
        assert_eq!(parsed.led_brightness, None);
    }
}
