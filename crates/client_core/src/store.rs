//! Locally displayed actuator state and the sequence rules that keep it
//! consistent with backend-reported truth.

use std::sync::atomic::{AtomicU64, Ordering};

use shared::{
    domain::{Actuator, ActuatorState},
    protocol::StateSnapshot,
};
use tokio::sync::Mutex;

/// Engine-wide monotonic sequence source.
///
/// Command intents and reconciliation snapshots draw from the same
/// counter, which makes the staleness comparison between the two update
/// channels well-defined.
#[derive(Debug, Default)]
pub struct Sequencer(AtomicU64);

impl Sequencer {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Partial overwrite of displayed state. Values are clamped by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub led_brightness: Option<i64>,
    pub servo_angle: Option<i64>,
}

impl StatePatch {
    pub fn led(value: i64) -> Self {
        Self {
            led_brightness: Some(value),
            ..Self::default()
        }
    }

    pub fn servo(value: i64) -> Self {
        Self {
            servo_angle: Some(value),
            ..Self::default()
        }
    }
}

/// Authoritative snapshot queued for merge. `None` fields are untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationSnapshot {
    pub led_brightness: Option<i64>,
    pub servo_angle: Option<i64>,
    pub source_seq: u64,
}

impl ReconciliationSnapshot {
    pub fn from_wire(snapshot: StateSnapshot, source_seq: u64) -> Self {
        Self {
            led_brightness: Some(snapshot.led_brightness),
            servo_angle: Some(snapshot.servo_angle),
            source_seq,
        }
    }
}

#[derive(Debug, Default)]
struct FieldSlot {
    value: i64,
    last_local_seq: u64,
    in_flight: Option<u64>,
}

impl FieldSlot {
    fn apply_local(&mut self, value: i64, seq: u64) {
        self.value = value;
        if seq >= self.last_local_seq {
            self.last_local_seq = seq;
        }
        // A newer intent's mark is never displaced by an older one.
        match self.in_flight {
            Some(current) if current > seq => {}
            _ => self.in_flight = Some(seq),
        }
    }

    fn complete_local(&mut self, seq: u64) {
        if self.in_flight == Some(seq) {
            self.in_flight = None;
        }
    }

    fn reconcile(&mut self, value: i64, source_seq: u64) -> bool {
        // Staleness rule: never overwrite a field a local command touched
        // after this snapshot's sequence point, or one whose command is
        // still in flight.
        if self.last_local_seq > source_seq || self.in_flight.is_some() {
            return false;
        }
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    led: FieldSlot,
    servo: FieldSlot,
    last_snapshot_seq: u64,
}

impl StoreInner {
    fn state(&self) -> ActuatorState {
        ActuatorState {
            led_brightness: self.led.value,
            servo_angle: self.servo.value,
        }
    }
}

/// The single source of truth for displayed brightness and angle.
///
/// All mutation funnels through the dispatcher or the reconciler; both
/// paths serialize behind one mutex so the sequence bookkeeping is never
/// observed mid-update.
#[derive(Debug, Default)]
pub struct ActuatorStore {
    inner: Mutex<StoreInner>,
}

impl ActuatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> ActuatorState {
        self.inner.lock().await.state()
    }

    /// Immediate, unconditional overwrite of the patched fields, tagged
    /// with the issuing command's sequence number.
    pub async fn apply_optimistic(&self, patch: StatePatch, seq: u64) -> ActuatorState {
        let mut inner = self.inner.lock().await;
        if let Some(value) = patch.led_brightness {
            inner.led.apply_local(Actuator::Led.clamp(value), seq);
        }
        if let Some(value) = patch.servo_angle {
            inner.servo.apply_local(Actuator::Servo.clamp(value), seq);
        }
        inner.state()
    }

    /// Clears the actuator's in-flight mark, unless a newer command has
    /// superseded it.
    pub async fn complete_local(&self, actuator: Actuator, seq: u64) {
        let mut inner = self.inner.lock().await;
        match actuator {
            Actuator::Led => inner.led.complete_local(seq),
            Actuator::Servo => inner.servo.complete_local(seq),
        }
    }

    /// Merges an authoritative snapshot under the staleness rule.
    ///
    /// Snapshots arriving out of order are dropped wholesale; accepted
    /// snapshots still skip any field a fresher local command owns.
    /// Returns the new state only when a displayed value changed.
    pub async fn apply_reconciled(&self, snapshot: ReconciliationSnapshot) -> Option<ActuatorState> {
        let mut inner = self.inner.lock().await;
        if snapshot.source_seq <= inner.last_snapshot_seq {
            return None;
        }
        inner.last_snapshot_seq = snapshot.source_seq;

        let mut changed = false;
        if let Some(value) = snapshot.led_brightness {
            changed |= inner
                .led
                .reconcile(Actuator::Led.clamp(value), snapshot.source_seq);
        }
        if let Some(value) = snapshot.servo_angle {
            changed |= inner
                .servo
                .reconcile(Actuator::Servo.clamp(value), snapshot.source_seq);
        }
        changed.then(|| inner.state())
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
