//! Discord adapter.
//!
//! Opens one gateway connection, keeps it alive with heartbeats and feeds
//! every `MESSAGE_CREATE` into the runtime's event sink.
//!
//! ```rust,ignore
//! use retort_adapter_discord::{DiscordAdapter, DiscordConfig};
//!
//! let adapter = DiscordAdapter::new(DiscordConfig {
//!     token: std::env::var("DISCORD_TOKEN")?,
//!     ..Default::default()
//! });
//! ```
//!
//! Session lifecycle on every (re)connection:
//!
//! 1. the gateway sends `HELLO` with a heartbeat interval
//! 2. the adapter starts heartbeating and sends `IDENTIFY`
//! 3. the gateway answers with `READY`, which fixes the bot's own id
//! 4. `MESSAGE_CREATE` dispatches follow

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use retort_core::{
    Adapter, AdapterContext, AdapterError, AdapterResult, BoxedBot, ConfigurableAdapter,
    ConnectionHandle, ConnectionHandler, ConnectionInfo, EventSink, MessageEvent,
};

use crate::bot::DiscordBot;
use crate::config::DiscordConfig;
use crate::model::{DispatchEvent, GatewayEvent, GatewayPayload, heartbeat, identify};

/// Wait before re-identifying after `INVALID_SESSION`.
const INVALID_SESSION_DELAY: Duration = Duration::from_secs(2);

/// Floor for the heartbeat interval announced by the gateway.
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// The Discord adapter.
#[derive(Debug, Default)]
pub struct DiscordAdapter {
    config: DiscordConfig,
}

impl DiscordAdapter {
    /// Creates an adapter from its configuration.
    pub fn new(config: DiscordConfig) -> Self {
        Self { config }
    }

    /// Returns the adapter configuration.
    pub fn config(&self) -> &DiscordConfig {
        &self.config
    }
}

#[async_trait]
impl Adapter for DiscordAdapter {
    fn name() -> &'static str {
        "discord"
    }

    async fn on_start(&self, ctx: &mut AdapterContext) -> anyhow::Result<()> {
        let ws = ctx
            .transport()
            .ws_client()
            .cloned()
            .context("WebSocket client transport is not available")?;
        let http = ctx
            .transport()
            .http_client()
            .cloned()
            .context("HTTP client transport is not available")?;

        let bot = Arc::new(DiscordBot::new(&self.config, http));
        let handler = Arc::new(GatewayHandler::new(&self.config, bot, ctx.event_sink()));

        info!(url = %self.config.gateway_url, "Starting Discord adapter");
        let handle = ws
            .connect(
                &self.config.gateway_url,
                handler,
                self.config.reconnect.to_client_config(),
            )
            .await
            .context("failed to connect to the Discord gateway")?;

        ctx.add_connection(handle);
        Ok(())
    }
}

impl ConfigurableAdapter for DiscordAdapter {
    type Config = DiscordConfig;

    fn from_config(config: Self::Config) -> AdapterResult<Arc<Self>> {
        if !config.has_token() {
            return Err(AdapterError::internal("discord token is not configured"));
        }
        config
            .reconnect
            .validate()
            .map_err(|reason| AdapterError::internal(format!("invalid discord settings: {reason}")))?;
        Ok(Arc::new(Self::new(config)))
    }
}

// =============================================================================
// Gateway Connection Handler
// =============================================================================

/// Drives the gateway protocol for one connection.
struct GatewayHandler {
    token: String,
    intents: u64,
    bot: Arc<DiscordBot>,
    sink: EventSink,
    /// Last dispatch sequence number, 0 before the first dispatch.
    sequence: Arc<AtomicU64>,
    connection: Mutex<Option<ConnectionHandle>>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    /// Delayed IDENTIFY after `INVALID_SESSION`.
    reidentify: Mutex<Option<JoinHandle<()>>>,
}

impl GatewayHandler {
    fn new(config: &DiscordConfig, bot: Arc<DiscordBot>, sink: EventSink) -> Self {
        Self {
            token: config.bare_token().to_string(),
            intents: config.intents,
            bot,
            sink,
            sequence: Arc::new(AtomicU64::new(0)),
            connection: Mutex::new(None),
            heartbeat: Mutex::new(None),
            reidentify: Mutex::new(None),
        }
    }

    fn connection(&self) -> Option<ConnectionHandle> {
        self.connection.lock().clone()
    }

    async fn send(&self, frame: &Value) {
        let Some(connection) = self.connection() else {
            warn!("No gateway connection, dropping frame");
            return;
        };
        if let Err(e) = connection.send_json(frame).await {
            warn!(error = %e, "Failed to send gateway frame");
        }
    }

    async fn identify(&self) {
        debug!(intents = self.intents, "Identifying");
        self.send(&identify(&self.token, self.intents)).await;
    }

    fn start_heartbeat(&self, interval: Duration) {
        let Some(connection) = self.connection() else {
            return;
        };
        let sequence = Arc::clone(&self.sequence);
        let period = interval.max(MIN_HEARTBEAT_INTERVAL);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let frame = heartbeat(last_sequence(&sequence));
                trace!(frame = %frame, "Sending heartbeat");
                if let Err(e) = connection.send_json(&frame).await {
                    debug!(error = %e, "Heartbeat stopped");
                    break;
                }
            }
        });

        if let Some(previous) = self.heartbeat.lock().replace(task) {
            previous.abort();
        }
    }

    fn stop_heartbeat(&self) {
        if let Some(task) = self.heartbeat.lock().take() {
            task.abort();
        }
    }

    /// Identifies again after `delay` without holding up the read loop.
    fn schedule_identify(&self, delay: Duration) {
        let Some(connection) = self.connection() else {
            return;
        };
        let frame = identify(&self.token, self.intents);
        let intents = self.intents;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(intents, "Identifying");
            if let Err(e) = connection.send_json(&frame).await {
                warn!(error = %e, "Failed to send gateway frame");
            }
        });

        if let Some(previous) = self.reidentify.lock().replace(task) {
            previous.abort();
        }
    }

    fn cancel_identify(&self) {
        if let Some(task) = self.reidentify.lock().take() {
            task.abort();
        }
    }

    fn on_dispatch(&self, event: DispatchEvent) {
        match event {
            DispatchEvent::Ready(ready) => {
                self.bot.identify_as(&ready.user.id, &ready.session_id);
                info!(
                    user_id = %ready.user.id,
                    username = %ready.user.username,
                    "Discord session ready"
                );
            }
            DispatchEvent::MessageCreate(msg) => {
                debug!(
                    message_id = %msg.id,
                    channel_id = %msg.channel_id,
                    guild_id = ?msg.guild_id,
                    "Received message"
                );
                let bot: BoxedBot = self.bot.clone();
                (self.sink)(MessageEvent::from(msg), bot);
            }
            DispatchEvent::Other(name) => {
                trace!(event = %name, "Ignoring dispatch");
            }
        }
    }
}

fn last_sequence(sequence: &AtomicU64) -> Option<u64> {
    match sequence.load(Ordering::SeqCst) {
        0 => None,
        seq => Some(seq),
    }
}

#[async_trait]
impl ConnectionHandler for GatewayHandler {
    async fn on_connect(&self, info: ConnectionInfo, connection: ConnectionHandle) {
        info!(url = ?info.metadata.get("url"), "Gateway connection established");
        self.stop_heartbeat();
        self.cancel_identify();
        self.sequence.store(0, Ordering::SeqCst);
        *self.connection.lock() = Some(connection);
    }

    async fn on_message(&self, data: &[u8]) {
        let payload = match GatewayPayload::from_slice(data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, raw = %String::from_utf8_lossy(data), "Failed to parse gateway frame");
                return;
            }
        };

        // Heartbeats acknowledge every dispatch received, decodable or not.
        if let Some(seq) = payload.s {
            self.sequence.fetch_max(seq, Ordering::SeqCst);
        }

        let event = match GatewayEvent::decode(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, raw = %String::from_utf8_lossy(data), "Failed to decode gateway event");
                return;
            }
        };

        match event {
            GatewayEvent::Hello(hello) => {
                debug!(interval_ms = hello.heartbeat_interval, "Received HELLO");
                self.start_heartbeat(Duration::from_millis(hello.heartbeat_interval));
                self.identify().await;
            }
            GatewayEvent::HeartbeatRequest => {
                self.send(&heartbeat(last_sequence(&self.sequence))).await;
            }
            GatewayEvent::HeartbeatAck => trace!("Heartbeat acknowledged"),
            GatewayEvent::Reconnect => {
                info!("Gateway requested reconnect");
                self.stop_heartbeat();
                if let Some(connection) = self.connection() {
                    connection.reconnect();
                }
            }
            GatewayEvent::InvalidSession { resumable } => {
                warn!(resumable, "Gateway invalidated the session, identifying again");
                self.sequence.store(0, Ordering::SeqCst);
                self.schedule_identify(INVALID_SESSION_DELAY);
            }
            GatewayEvent::Dispatch(event) => self.on_dispatch(*event),
            GatewayEvent::Unknown(op) => debug!(op, "Ignoring unknown opcode"),
        }
    }

    async fn on_disconnect(&self) {
        self.stop_heartbeat();
        self.cancel_identify();
        self.connection.lock().take();
        info!("Gateway connection closed");
    }
}
