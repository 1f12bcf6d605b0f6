use serde::{Deserialize, Serialize};

pub const LED_BRIGHTNESS_MIN: i64 = 0;
pub const LED_BRIGHTNESS_MAX: i64 = 100;
pub const SERVO_ANGLE_MIN: i64 = 0;
pub const SERVO_ANGLE_MAX: i64 = 180;

/// The two actuators exposed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Led,
    Servo,
}

impl Actuator {
    /// Clamps a requested value into the actuator's valid range.
    /// Out-of-range input is never an error anywhere in the client.
    pub fn clamp(self, value: i64) -> i64 {
        match self {
            Actuator::Led => value.clamp(LED_BRIGHTNESS_MIN, LED_BRIGHTNESS_MAX),
            Actuator::Servo => value.clamp(SERVO_ANGLE_MIN, SERVO_ANGLE_MAX),
        }
    }
}

/// Displayed actuator state. Invariant: both fields are always in range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub led_brightness: i64,
    pub servo_angle: i64,
}

/// Coarse liveness of the backend as observed by the client.
///
/// Starts `Unknown`, becomes `Connected` on the first successful
/// reconciliation or channel connect, `Disconnected` on a failure or
/// channel disconnect, and never reverts to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Unknown,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "backend unreachable",
            ConnectionState::Unknown => "waiting for first contact",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_input_to_boundaries() {
        assert_eq!(Actuator::Led.clamp(150), LED_BRIGHTNESS_MAX);
        assert_eq!(Actuator::Led.clamp(-5), LED_BRIGHTNESS_MIN);
        assert_eq!(Actuator::Servo.clamp(200), SERVO_ANGLE_MAX);
        assert_eq!(Actuator::Servo.clamp(-10), SERVO_ANGLE_MIN);
    }

    #[test]
    fn leaves_in_range_input_untouched() {
        assert_eq!(Actuator::Led.clamp(0), 0);
        assert_eq!(Actuator::Led.clamp(100), 100);
        assert_eq!(Actuator::Servo.clamp(90), 90);
    }
}
