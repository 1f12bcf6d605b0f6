//! Coarse backend liveness derived from reconciliation outcomes.

use chrono::{DateTime, Utc};
use shared::domain::ConnectionState;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::ClientEvent;

/// Current liveness plus display copy for the surface footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub label: &'static str,
    pub since: DateTime<Utc>,
}

#[derive(Debug)]
struct MonitorInner {
    state: ConnectionState,
    since: DateTime<Utc>,
}

/// Pure observer over the reconciler's success/failure signals and the
/// push channel's connect/disconnect events. Issues no requests of its
/// own.
pub struct ConnectionMonitor {
    inner: Mutex<MonitorInner>,
    events: broadcast::Sender<ClientEvent>,
}

impl ConnectionMonitor {
    pub(crate) fn new(events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            inner: Mutex::new(MonitorInner {
                state: ConnectionState::Unknown,
                since: Utc::now(),
            }),
            events,
        }
    }

    pub async fn status(&self) -> ConnectionStatus {
        let inner = self.inner.lock().await;
        ConnectionStatus {
            state: inner.state,
            label: inner.state.label(),
            since: inner.since,
        }
    }

    pub(crate) async fn record_success(&self) {
        self.transition(ConnectionState::Connected).await;
    }

    pub(crate) async fn record_failure(&self) {
        self.transition(ConnectionState::Disconnected).await;
    }

    pub(crate) async fn channel_connected(&self) {
        self.transition(ConnectionState::Connected).await;
    }

    pub(crate) async fn channel_disconnected(&self) {
        self.transition(ConnectionState::Disconnected).await;
    }

    async fn transition(&self, next: ConnectionState) {
        let status = {
            let mut inner = self.inner.lock().await;
            if inner.state == next {
                return;
            }
            inner.state = next;
            inner.since = Utc::now();
            ConnectionStatus {
                state: next,
                label: next.label(),
                since: inner.since,
            }
        };
        info!(state = status.label, "connection state changed");
        let _ = self.events.send(ClientEvent::ConnectionChanged(status));
    }
}

#[cfg(test)]
#[path = "tests/monitor_tests.rs"]
mod tests;
