//! Voice capture session management.
//!
//! The capture mechanism itself is an external collaborator behind
//! [`SpeechCapture`]; one session yields exactly one transcript, error,
//! or cancellation, then the pipeline is idle again.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Transcript(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("no speech detected")]
    NoSpeech,
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("speech capture unavailable")]
    Unavailable,
    #[error("speech capture failed: {0}")]
    Other(String),
}

impl CaptureError {
    /// Short copy shown to the user. Only the first two kinds carry
    /// distinct wording; everything else is generic.
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::NoSpeech => "No speech detected, please try again",
            CaptureError::PermissionDenied => "Please allow microphone access",
            CaptureError::Unavailable | CaptureError::Other(_) => {
                "Voice capture failed, type the command instead"
            }
        }
    }
}

#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Runs one capture session to completion.
    async fn capture(&self) -> Result<CaptureOutcome, CaptureError>;

    /// Asks the active session to finish early with
    /// [`CaptureOutcome::Cancelled`]. No-op when idle.
    async fn stop(&self);
}

/// Placeholder for deployments without a microphone; every session
/// fails and the surface degrades to typed commands.
pub struct MissingSpeechCapture;

#[async_trait]
impl SpeechCapture for MissingSpeechCapture {
    async fn capture(&self) -> Result<CaptureOutcome, CaptureError> {
        Err(CaptureError::Unavailable)
    }

    async fn stop(&self) {}
}

/// Capture-session state machine: `Idle -> Listening -> Idle`.
///
/// Starting while already listening is a no-op; `stop` is the only
/// cancellation path. At most one session is ever active.
pub struct VoicePipeline {
    capture: Arc<dyn SpeechCapture>,
    listening: AtomicBool,
}

impl VoicePipeline {
    pub(crate) fn new(capture: Arc<dyn SpeechCapture>) -> Self {
        Self {
            capture,
            listening: AtomicBool::new(false),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub(crate) fn try_begin(&self) -> bool {
        !self.listening.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn finish(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    pub(crate) fn backend(&self) -> Arc<dyn SpeechCapture> {
        Arc::clone(&self.capture)
    }
}
