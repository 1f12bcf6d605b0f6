//! State synchronization and command dispatch for a two-actuator bench
//! device (a dimmable light and a positional arm).
//!
//! The engine keeps a locally displayed [`ActuatorState`] consistent
//! with the backend's authoritative state under two independent update
//! channels: user commands, which take effect optimistically, and
//! server-originated refresh via polling and/or an event-push channel.
//! Which update wins is decided by sequence numbers, never by arrival
//! order.
//!
//! [`ActuatorState`]: shared::domain::ActuatorState

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use reqwest::Client;
use shared::{
    domain::{Actuator, ActuatorState},
    protocol::{
        SetLedRequest, SetLedResponse, SetServoRequest, SetServoResponse, VoiceRequest,
        VoiceResponse,
    },
};
use tokio::sync::broadcast;
use tracing::{info, warn};

pub mod error;
mod monitor;
mod reconcile;
mod store;
mod voice;

pub use error::CommandError;
pub use monitor::{ConnectionMonitor, ConnectionStatus};
pub use reconcile::DEFAULT_POLL_INTERVAL;
pub use store::{ActuatorStore, ReconciliationSnapshot, Sequencer, StatePatch};
pub use voice::{CaptureError, CaptureOutcome, MissingSpeechCapture, SpeechCapture, VoicePipeline};

/// Copy shown when the interpreter request itself failed.
const VOICE_FAILURE_MESSAGE: &str = "Something went wrong while handling the command, try again";

/// Engine events front-ends subscribe to. Every mutation of displayed
/// state, liveness, or the voice session surfaces here.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    StateChanged(ActuatorState),
    ConnectionChanged(ConnectionStatus),
    ListeningChanged(bool),
    /// The interpreter's reply text for a voice command.
    InterpreterReply(String),
    /// Short user-facing error copy; the session itself keeps running.
    UserError(String),
}

/// The synchronization engine. Owns the store exclusively; front-ends
/// read snapshots and subscribe to [`ClientEvent`]s.
pub struct DeviceClient {
    http: Client,
    base_url: String,
    store: ActuatorStore,
    seq: Sequencer,
    monitor: ConnectionMonitor,
    voice: VoicePipeline,
    voice_in_flight: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
}

impl DeviceClient {
    pub fn new(base_url: impl Into<String>) -> Arc<Self> {
        Self::new_with_capture(base_url, Arc::new(MissingSpeechCapture))
    }

    pub fn new_with_capture(
        base_url: impl Into<String>,
        capture: Arc<dyn SpeechCapture>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Arc::new(Self {
            http: Client::new(),
            base_url,
            store: ActuatorStore::new(),
            seq: Sequencer::default(),
            monitor: ConnectionMonitor::new(events.clone()),
            voice: VoicePipeline::new(capture),
            voice_in_flight: AtomicBool::new(false),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn read_state(&self) -> ActuatorState {
        self.store.read().await
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        self.monitor.status().await
    }

    pub fn is_listening(&self) -> bool {
        self.voice.is_listening()
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    fn emit_state(&self, state: ActuatorState) {
        self.emit(ClientEvent::StateChanged(state));
    }

    /// Sets the light's brightness. The displayed value changes
    /// immediately; the backend's echo is reconciled under the command's
    /// own sequence number so a lagging poll cannot revert it.
    pub async fn set_led(&self, brightness: i64) -> Result<(), CommandError> {
        let target = Actuator::Led.clamp(brightness);
        let seq = self.seq.next();
        let state = self
            .store
            .apply_optimistic(StatePatch::led(target), seq)
            .await;
        self.emit_state(state);

        let response = self.post_led(target).await;
        self.store.complete_local(Actuator::Led, seq).await;
        match response {
            Ok(body) => {
                if !body.ok {
                    return Err(CommandError::Rejected);
                }
                if let Some(value) = body.led_brightness {
                    let snapshot = ReconciliationSnapshot {
                        led_brightness: Some(value),
                        servo_angle: None,
                        source_seq: seq,
                    };
                    if let Some(state) = self.store.apply_reconciled(snapshot).await {
                        self.emit_state(state);
                    }
                }
                Ok(())
            }
            Err(err) => {
                // Optimistic value stays on screen; the next poll
                // corrects any drift.
                warn!(brightness = target, "led command failed: {err}");
                self.monitor.record_failure().await;
                Err(CommandError::Transport(err))
            }
        }
    }

    /// Sets the arm's angle. Same optimistic/reconcile cycle as
    /// [`set_led`](Self::set_led).
    pub async fn set_servo(&self, angle: i64) -> Result<(), CommandError> {
        let target = Actuator::Servo.clamp(angle);
        let seq = self.seq.next();
        let state = self
            .store
            .apply_optimistic(StatePatch::servo(target), seq)
            .await;
        self.emit_state(state);

        let response = self.post_servo(target).await;
        self.store.complete_local(Actuator::Servo, seq).await;
        match response {
            Ok(body) => {
                if !body.ok {
                    return Err(CommandError::Rejected);
                }
                if let Some(value) = body.servo_angle {
                    let snapshot = ReconciliationSnapshot {
                        led_brightness: None,
                        servo_angle: Some(value),
                        source_seq: seq,
                    };
                    if let Some(state) = self.store.apply_reconciled(snapshot).await {
                        self.emit_state(state);
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!(angle = target, "servo command failed: {err}");
                self.monitor.record_failure().await;
                Err(CommandError::Transport(err))
            }
        }
    }

    /// Sends free text to the interpreter endpoint.
    ///
    /// Empty text is rejected locally without a request. While one
    /// command is in flight the surface is busy: duplicates are
    /// rejected, not queued. There is no optimistic update; the intent
    /// is only known once the backend has interpreted it.
    pub async fn send_voice_command(&self, text: &str) -> Result<(), CommandError> {
        let command = text.trim();
        if command.is_empty() {
            return Err(CommandError::EmptyCommand);
        }
        if self.voice_in_flight.swap(true, Ordering::SeqCst) {
            return Err(CommandError::VoiceBusy);
        }
        let result = self.dispatch_voice(command).await;
        self.voice_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn dispatch_voice(&self, command: &str) -> Result<(), CommandError> {
        let seq = self.seq.next();
        match self.post_voice(command).await {
            Ok(body) => {
                info!(command, reply = %body.response, "voice command interpreted");
                self.emit(ClientEvent::InterpreterReply(body.response));
                if body.led_brightness.is_some() || body.servo_angle.is_some() {
                    let snapshot = ReconciliationSnapshot {
                        led_brightness: body.led_brightness,
                        servo_angle: body.servo_angle,
                        source_seq: seq,
                    };
                    if let Some(state) = self.store.apply_reconciled(snapshot).await {
                        self.emit_state(state);
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!(command, "voice command failed: {err}");
                self.monitor.record_failure().await;
                self.emit(ClientEvent::UserError(VOICE_FAILURE_MESSAGE.to_string()));
                Err(CommandError::Transport(err))
            }
        }
    }

    /// Begins a voice capture session. Returns `false` (and does
    /// nothing) when a session is already listening. The transcript, if
    /// any, is dispatched fire-and-forget.
    pub fn start_listening(self: &Arc<Self>) -> bool {
        if !self.voice.try_begin() {
            return false;
        }
        self.emit(ClientEvent::ListeningChanged(true));
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = client.voice.backend().capture().await;
            client.voice.finish();
            client.emit(ClientEvent::ListeningChanged(false));
            match outcome {
                Ok(CaptureOutcome::Transcript(transcript)) => {
                    info!(transcript, "voice transcript captured");
                    if let Err(err) = client.send_voice_command(&transcript).await {
                        warn!("captured transcript was not dispatched: {err}");
                    }
                }
                Ok(CaptureOutcome::Cancelled) => info!("voice capture cancelled"),
                Err(err) => {
                    warn!("voice capture failed: {err}");
                    client.emit(ClientEvent::UserError(err.user_message().to_string()));
                }
            }
        });
        true
    }

    /// Asks the active capture session, if any, to cancel.
    pub async fn stop_listening(&self) {
        if self.voice.is_listening() {
            self.voice.backend().stop().await;
        }
    }

    async fn post_led(&self, brightness: i64) -> Result<SetLedResponse, reqwest::Error> {
        self.http
            .post(format!("{}/led", self.base_url))
            .json(&SetLedRequest { brightness })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn post_servo(&self, angle: i64) -> Result<SetServoResponse, reqwest::Error> {
        self.http
            .post(format!("{}/servo", self.base_url))
            .json(&SetServoRequest { angle })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn post_voice(&self, command: &str) -> Result<VoiceResponse, reqwest::Error> {
        self.http
            .post(format!("{}/voice", self.base_url))
            .json(&VoiceRequest {
                command: command.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/voice_tests.rs"]
mod voice_tests;
