//! Authoritative state refresh: the polling and push strategies.
//!
//! Both strategies funnel through [`ActuatorStore::apply_reconciled`]
//! and draw their sequence numbers from the engine's shared sequencer,
//! so running them concurrently cannot regress either one.
//!
//! [`ActuatorStore::apply_reconciled`]: crate::ActuatorStore::apply_reconciled

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use shared::protocol::{DeviceEvent, StateSnapshot};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

use crate::{ClientEvent, DeviceClient, ReconciliationSnapshot};

/// The original deployment refreshed every two seconds.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const PUSH_RECONNECT_DELAY: Duration = Duration::from_secs(5);

impl DeviceClient {
    /// Spawns the fixed-interval polling strategy. The first cycle runs
    /// immediately so the surface starts from authoritative state.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                client.poll_once().await;
            }
        })
    }

    /// One polling cycle: fetch the authoritative snapshot and merge it.
    ///
    /// The sequence number is drawn when the request is issued, so a
    /// slow response can never outrank a command the user issued while
    /// the poll was in flight. One failure per cycle, no retry.
    pub async fn poll_once(&self) {
        let source_seq = self.seq.next();
        match self.fetch_state().await {
            Ok(snapshot) => {
                self.monitor.record_success().await;
                let snapshot = ReconciliationSnapshot::from_wire(snapshot, source_seq);
                if let Some(state) = self.store.apply_reconciled(snapshot).await {
                    self.emit(ClientEvent::StateChanged(state));
                }
            }
            Err(err) => {
                warn!("state poll failed: {err}");
                self.monitor.record_failure().await;
            }
        }
    }

    async fn fetch_state(&self) -> Result<StateSnapshot, reqwest::Error> {
        self.http
            .get(format!("{}/state", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Spawns the push strategy: subscribe to the event channel, apply
    /// `state_update` events as they arrive, reconnect with a fixed
    /// delay when the channel drops.
    pub fn spawn_push_channel(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match client.run_push_channel().await {
                    Ok(()) => info!("push channel closed by server"),
                    Err(err) => warn!("push channel failed: {err}"),
                }
                client.monitor.channel_disconnected().await;
                tokio::time::sleep(PUSH_RECONNECT_DELAY).await;
            }
        })
    }

    pub(crate) async fn run_push_channel(&self) -> Result<()> {
        let ws_url = events_url(&self.base_url)?;
        let (stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect push channel: {ws_url}"))?;
        self.monitor.channel_connected().await;

        let (_, mut reader) = stream.split();
        while let Some(message) = reader.next().await {
            match message {
                Ok(Message::Text(text)) => self.handle_push_event(&text).await,
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => return Err(err).context("push channel receive failed"),
            }
        }
        Ok(())
    }

    async fn handle_push_event(&self, text: &str) {
        match serde_json::from_str::<DeviceEvent>(text) {
            Ok(DeviceEvent::StateUpdate(snapshot)) => {
                // Stamped at arrival; ordering within the channel is the
                // channel's own.
                let source_seq = self.seq.next();
                self.monitor.record_success().await;
                let snapshot = ReconciliationSnapshot::from_wire(snapshot, source_seq);
                if let Some(state) = self.store.apply_reconciled(snapshot).await {
                    self.emit(ClientEvent::StateChanged(state));
                }
            }
            Ok(DeviceEvent::Connect) => self.monitor.channel_connected().await,
            Ok(DeviceEvent::Disconnect) => self.monitor.channel_disconnected().await,
            Err(err) => warn!("ignoring malformed device event: {err}"),
        }
    }
}

fn events_url(base_url: &str) -> Result<String> {
    let ws_base = if base_url.starts_with("https://") {
        base_url.replacen("https://", "wss://", 1)
    } else if base_url.starts_with("http://") {
        base_url.replacen("http://", "ws://", 1)
    } else {
        return Err(anyhow!("device url must start with http:// or https://"));
    };
    Ok(format!("{ws_base}/events"))
}
