//! Live-update client: reconnecting push channel with event fan-out.
//!
//! DESIGN
//! ======
//! `LiveClient` is a cheap `Arc` handle constructed once by the application
//! and cloned into whatever needs it. It owns three things:
//! - the connection state: transport handle, pending reconnect timer, the
//!   intentionally-closed flag, and a status
//! - the event registry (survives disconnects and reconnects)
//! - the collaborators: a [`Connector`] and a [`TokenSource`]
//!
//! `connect()` returns immediately; a spawned attempt task reads the token,
//! opens a session, then drives that session's inbound events one at a time
//! so listeners observe messages in arrival order.
//!
//! RECONNECT POLICY
//! ================
//! Fixed interval, no backoff, no attempt cap. Only a close (or a failed
//! open) schedules a retry; transport errors alone do not. At most one timer
//! is pending at once.
//!
//! Each `disconnect()` advances an epoch. Attempt and timer tasks carry the
//! epoch they were started under and stand down when it no longer matches,
//! so a session that finishes opening after `disconnect()` is closed instead
//! of installed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LiveConfig;
use crate::envelope::Envelope;
use crate::event::{CONNECTED, DISCONNECTED, ERROR, Notification};
use crate::registry::{Callback, EventRegistry, callback};
use crate::token::{NoToken, TokenSource};
use crate::transport::{Connector, Incoming, Outgoing, Session, WsConnector};

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

// =============================================================================
// CONNECTION STATE
// =============================================================================

/// Pending reconnect. `seq` identifies the timer task so a late-running
/// task never clears a slot that a newer timer now owns.
struct ReconnectTimer {
    seq: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Connection {
    status: ConnectionStatus,
    transport: Option<tokio::sync::mpsc::UnboundedSender<Outgoing>>,
    reconnect_timer: Option<ReconnectTimer>,
    timer_seq: u64,
    intentionally_closed: bool,
    epoch: u64,
}

impl Connection {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && !self.intentionally_closed
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.handle.abort();
        }
    }
}

struct Inner {
    config: LiveConfig,
    connector: Arc<dyn Connector>,
    tokens: Arc<dyn TokenSource>,
    registry: EventRegistry,
    connection: Mutex<Connection>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct LiveClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClient")
            .field("url", &self.inner.config.url)
            .field("status", &self.status())
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl LiveClient {
    /// Client using the WebSocket connector and no credentials.
    #[must_use]
    pub fn new(config: LiveConfig) -> Self {
        Self::with_parts(config, Arc::new(WsConnector), Arc::new(NoToken))
    }

    #[must_use]
    pub fn with_parts(config: LiveConfig, connector: Arc<dyn Connector>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                tokens,
                registry: EventRegistry::new(),
                connection: Mutex::new(Connection::default()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LiveConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().status
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Start connecting in the background.
    ///
    /// No-op when the feature flag is off or a session is already connecting
    /// or open. A pending reconnect timer is cancelled and the attempt starts
    /// now. Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        if !self.inner.config.enabled {
            debug!("live updates disabled; connect ignored");
            return;
        }

        let epoch = {
            let mut conn = self.inner.lock();
            if conn.status != ConnectionStatus::Disconnected {
                debug!(status = ?conn.status, "live-update client already active");
                return;
            }
            conn.intentionally_closed = false;
            conn.cancel_reconnect();
            conn.status = ConnectionStatus::Connecting;
            conn.epoch
        };

        tokio::spawn(run_attempt(self.clone(), epoch));
    }

    /// Tear down the session and suppress automatic reconnection.
    ///
    /// Idempotent. Returns before the `disconnected` event is delivered.
    pub fn disconnect(&self) {
        let mut conn = self.inner.lock();
        conn.intentionally_closed = true;
        conn.epoch = conn.epoch.wrapping_add(1);
        conn.cancel_reconnect();
        if let Some(transport) = conn.transport.take() {
            let _ = transport.send(Outgoing::Close);
        }
        conn.status = ConnectionStatus::Disconnected;
    }

    /// Send a stamped envelope if the session is open; otherwise log and drop.
    pub fn send(&self, kind: &str, data: Value) {
        let conn = self.inner.lock();
        let Some(transport) = conn.transport.as_ref().filter(|_| conn.status == ConnectionStatus::Connected) else {
            warn!(kind, "live-update connection not open; dropping message");
            return;
        };

        let payload = match Envelope::outbound(kind, data).and_then(|envelope| envelope.to_json()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(kind, error = %e, "failed to encode live-update message");
                return;
            }
        };
        if transport.send(Outgoing::Text(payload)).is_err() {
            warn!(kind, "live-update transport gone; dropping message");
        }
    }

    /// Register `callback` for `event`. Registering the same handle twice
    /// under one event is a no-op.
    pub fn subscribe(&self, event: &str, callback: Callback) -> Subscription {
        self.inner.registry.subscribe(event, Arc::clone(&callback));
        Subscription { client: Arc::downgrade(&self.inner), event: event.to_owned(), callback }
    }

    /// Remove `callback` from `event`; no-op when not registered.
    pub fn unsubscribe(&self, event: &str, callback: &Callback) {
        self.inner.registry.unsubscribe(event, callback);
    }

    /// Subscribe a closure.
    pub fn on<F>(&self, event: &str, f: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.subscribe(event, callback(f))
    }

    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.registry.listener_count(event)
    }

    fn emit(&self, event: &str, notification: &Notification) {
        self.inner.registry.emit(event, notification);
    }

    fn dispatch(&self, text: &str) {
        match Envelope::parse(text) {
            Ok(envelope) => {
                let event = envelope.event_name().to_owned();
                self.emit(&event, &Notification::Message(envelope));
            }
            Err(e) => warn!(error = %e, "dropping malformed live-update message"),
        }
    }

    /// Arm the reconnect timer. Returns `false` when a timer is already
    /// pending or `epoch` is no longer current.
    fn schedule_reconnect(&self, epoch: u64) -> bool {
        let mut conn = self.inner.lock();
        if !conn.is_current(epoch) || conn.reconnect_timer.is_some() {
            return false;
        }

        let interval = self.inner.config.reconnect_interval;
        info!(
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "live-update reconnect scheduled"
        );
        conn.timer_seq = conn.timer_seq.wrapping_add(1);
        let seq = conn.timer_seq;
        let client = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            client.fire_reconnect(epoch, seq);
        });
        conn.reconnect_timer = Some(ReconnectTimer { seq, handle });
        true
    }

    fn fire_reconnect(&self, epoch: u64, seq: u64) {
        {
            let mut conn = self.inner.lock();
            // A cancelled timer can still reach here if it was already past
            // its sleep when aborted; only the slot's owner may proceed.
            if conn.reconnect_timer.as_ref().is_none_or(|timer| timer.seq != seq) {
                debug!(seq, "stale live-update reconnect timer ignored");
                return;
            }
            // Dropping our own handle detaches; it does not abort this task.
            conn.reconnect_timer = None;
            if !conn.is_current(epoch) || conn.status != ConnectionStatus::Disconnected {
                return;
            }
            conn.status = ConnectionStatus::Connecting;
        }
        tokio::spawn(run_attempt(self.clone(), epoch));
    }
}

// =============================================================================
// ATTEMPT / SESSION DRIVER
// =============================================================================

async fn run_attempt(client: LiveClient, epoch: u64) {
    let token = client.inner.tokens.access_token().await;
    let url = client.inner.config.endpoint_url(token.as_deref());
    debug!(base = %client.inner.config.url, authenticated = token.is_some(), "live-update connecting");

    let session = match client.inner.connector.open(&url).await {
        Ok(session) => session,
        Err(e) => {
            let current = {
                let mut conn = client.inner.lock();
                let current = conn.is_current(epoch);
                if current {
                    conn.status = ConnectionStatus::Disconnected;
                }
                current
            };
            warn!(error = %e, "live-update connection attempt failed");
            if current {
                client.emit(ERROR, &Notification::Error(e.to_string()));
                client.schedule_reconnect(epoch);
            }
            return;
        }
    };

    let Session { outgoing, mut incoming } = session;
    {
        let mut conn = client.inner.lock();
        if !conn.is_current(epoch) {
            debug!("live-update session opened after disconnect; closing");
            let _ = outgoing.send(Outgoing::Close);
            return;
        }
        conn.transport = Some(outgoing);
        conn.status = ConnectionStatus::Connected;
        conn.cancel_reconnect();
    }
    info!(base = %client.inner.config.url, "live-update connected");
    client.emit(CONNECTED, &Notification::Connected);

    while let Some(event) = incoming.recv().await {
        match event {
            Incoming::Text(text) => client.dispatch(&text),
            Incoming::Error(message) => {
                warn!(error = %message, "live-update transport error");
                client.emit(ERROR, &Notification::Error(message));
            }
            Incoming::Closed => break,
        }
    }

    let reconnect = {
        let mut conn = client.inner.lock();
        if conn.epoch == epoch {
            conn.transport = None;
            conn.status = ConnectionStatus::Disconnected;
        }
        conn.is_current(epoch)
    };
    info!(reconnect, "live-update disconnected");
    client.emit(DISCONNECTED, &Notification::Disconnected);
    if reconnect {
        client.schedule_reconnect(epoch);
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Disposer returned by [`LiveClient::subscribe`].
///
/// Dropping it keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    client: Weak<Inner>,
    event: String,
    callback: Callback,
}

impl Subscription {
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// The registered handle, for use with [`LiveClient::unsubscribe`].
    #[must_use]
    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn unsubscribe(self) {
        if let Some(inner) = self.client.upgrade() {
            inner.registry.unsubscribe(&self.event, &self.callback);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("event", &self.event).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
