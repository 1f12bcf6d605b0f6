use thiserror::Error;

/// Failures a dispatched command can surface to its caller.
///
/// A transport failure never rolls back the optimistic value; the next
/// reconciliation corrects any drift.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("device request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("device rejected the command")]
    Rejected,
    #[error("a voice command is already being interpreted")]
    VoiceBusy,
    #[error("voice command is empty")]
    EmptyCommand,
}
