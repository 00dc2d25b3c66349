//! Public handle for the multiplexed connection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use huddle_common::{Frame, FrameKind};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::connection::run_connection;
use super::registry::{Removal, SubscriptionRegistry};
use super::types::{ConnectionState, DeliveryMode, Handler, HandlerId, TransportConfig};
use crate::session::SessionCredential;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub(crate) struct Shared {
    config: TransportConfig,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
}

#[derive(Default)]
struct Inner {
    state: ConnectionState,
    registry: SubscriptionRegistry,
    /// Subscribe/unsubscribe intents waiting for the next `Open`.
    pending: VecDeque<Frame>,
    /// Writer queue of the live connection task.
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    torn_down: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        if inner.state != state {
            debug!(from = %inner.state, to = %state, "Transport state change");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    /// Send now if open, otherwise queue for the next open.
    fn send_or_queue(inner: &mut Inner, frame: Frame) {
        match (&inner.outbound, inner.state) {
            // A failed send means the socket is going away; its subscriptions
            // are requeued by `mark_disconnected`.
            (Some(tx), ConnectionState::Open) => {
                let _ = tx.send(frame);
            }
            _ => inner.pending.push_back(frame),
        }
    }

    /// Called by the connection task once the handshake completes.
    /// Returns false if the transport was torn down in the meantime.
    pub(crate) fn mark_open(&self, tx: mpsc::UnboundedSender<Frame>) -> bool {
        let mut inner = self.lock();
        if inner.torn_down {
            return false;
        }
        let flushed = inner.pending.len();
        while let Some(frame) = inner.pending.pop_front() {
            let _ = tx.send(frame);
        }
        inner.outbound = Some(tx);
        self.set_state(&mut inner, ConnectionState::Open);
        info!(flushed, "Transport connected");
        true
    }

    /// Called by the connection task when the socket ends for any reason.
    pub(crate) fn mark_disconnected(&self) {
        let mut inner = self.lock();
        if inner.torn_down {
            return;
        }
        let was_open = inner.state == ConnectionState::Open;
        inner.outbound = None;
        inner.shutdown_tx = None;
        if was_open {
            // The hub forgot our subscriptions along with the socket.
            for channel in inner.registry.active_channels() {
                inner.pending.push_back(Frame::subscribe(channel));
            }
        }
        self.set_state(&mut inner, ConnectionState::Disconnected);
        info!(requeued = inner.pending.len(), "Transport disconnected");
    }

    /// Route one inbound text frame to the handlers of its channel.
    pub(crate) fn dispatch_text(&self, text: &str) {
        let frame = match Frame::from_text(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };
        if frame.kind != FrameKind::Message {
            debug!(channel = %frame.channel, kind = ?frame.kind, "Ignoring non-message frame");
            return;
        }

        // Handlers may re-enter the transport, so never call them under the lock.
        let handlers = self.lock().registry.handlers(&frame.channel);
        if handlers.is_empty() {
            debug!(channel = %frame.channel, "No handlers for channel");
            return;
        }
        let content = frame.content.unwrap_or(Value::Null);
        for handler in handlers {
            handler(&content);
        }
    }

    fn release(&self, channel: &str, id: HandlerId) {
        let mut inner = self.lock();
        if inner.torn_down {
            return;
        }
        match inner.registry.remove(channel, id) {
            Removal::Last => {
                debug!(channel = %channel, "Last handler removed, unsubscribing");
                Self::send_or_queue(&mut inner, Frame::unsubscribe(channel));
            }
            Removal::Remaining => {}
            Removal::NotFound => {
                debug!(channel = %channel, ?id, "Unsubscribe for unknown handler");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Cloneable handle to the single physical connection of a session.
///
/// Clones share one connection, one subscription registry, and one pending
/// queue. Dependents receive a clone rather than reaching for a global.
#[derive(Clone)]
pub struct Transport {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("url", &self.shared.config.url)
            .field("state", &self.state())
            .finish()
    }
}

impl Transport {
    pub fn new(config: TransportConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(Inner::default()),
                state_tx,
            }),
        }
    }

    /// Open the physical connection for the given session.
    ///
    /// Never fails: a missing credential, an unsupported URL, or the absence
    /// of a Tokio runtime is logged and leaves the transport `Disconnected`.
    /// Calling this while connecting, open, or after `shutdown` does nothing.
    pub fn connect(&self, credential: Option<&SessionCredential>) {
        let mut inner = self.shared.lock();
        if inner.torn_down || inner.state != ConnectionState::Disconnected {
            debug!(state = %inner.state, "connect ignored");
            return;
        }
        let Some(credential) = credential else {
            warn!("No session credential, staying disconnected");
            return;
        };

        let base = &self.shared.config.url;
        if !(base.starts_with("ws://") || base.starts_with("wss://")) {
            error!(url = %base, "Transport URL must use ws:// or wss://");
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Runtime lacks transport support");
                return;
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        inner.shutdown_tx = Some(shutdown_tx);
        self.shared.set_state(&mut inner, ConnectionState::Connecting);
        drop(inner);

        info!(url = %base, profile_id = %credential.profile_id, "Connecting to hub");
        runtime.spawn(run_connection(
            Arc::downgrade(&self.shared),
            credential.authorize_url(base),
            self.shared.config.connect_timeout,
            shutdown_rx,
        ));
    }

    /// Register `handler` for `channel`.
    ///
    /// The returned handle unsubscribes when dropped.
    pub fn subscribe<F>(&self, channel: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut inner = self.shared.lock();
        if inner.torn_down {
            warn!(channel = %channel, "subscribe after shutdown ignored");
            return Subscription {
                shared: Weak::new(),
                channel: channel.to_string(),
                id: HandlerId(0),
            };
        }
        let handler: Handler = Arc::new(handler);
        let (id, first) = inner.registry.add(channel, handler);
        if first {
            debug!(channel = %channel, "First handler, subscribing");
            Shared::send_or_queue(&mut inner, Frame::subscribe(channel));
        }
        Subscription {
            shared: Arc::downgrade(&self.shared),
            channel: channel.to_string(),
            id,
        }
    }

    /// Remove one handler registration.
    pub fn unsubscribe(&self, channel: &str, id: HandlerId) {
        self.shared.release(channel, id);
    }

    /// Send an application message. Only delivered while `Open`; returns
    /// whether the frame was handed to the writer.
    pub fn publish(&self, channel: &str, content: Value) -> bool {
        let inner = self.shared.lock();
        if inner.state != ConnectionState::Open {
            debug!(channel = %channel, state = %inner.state, "publish dropped, not connected");
            return false;
        }
        match &inner.outbound {
            Some(tx) => tx.send(Frame::message(channel, content)).is_ok(),
            None => false,
        }
    }

    /// Tear down the connection and drop every registration. Terminal.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        if inner.torn_down {
            return;
        }
        inner.torn_down = true;
        inner.registry.clear();
        inner.pending.clear();
        inner.outbound = None;
        if let Some(tx) = inner.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.shared.set_state(&mut inner, ConnectionState::Closed);
        info!("Transport shut down");
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Receiver of every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn delivery_mode(&self, poll_interval: Duration) -> DeliveryMode {
        DeliveryMode::from_state(self.state(), poll_interval)
    }

    /// Number of intents waiting for the next open.
    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn handler_count(&self, channel: &str) -> usize {
        self.shared.lock().registry.handler_count(channel)
    }
}

#[cfg(test)]
impl Transport {
    /// Pretend the handshake succeeded; returns the outbound frame stream.
    pub(crate) fn open_for_test(&self) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.mark_open(tx);
        rx
    }

    pub(crate) fn drop_connection_for_test(&self) {
        self.shared.mark_disconnected();
    }

    pub(crate) fn inject_for_test(&self, text: &str) {
        self.shared.dispatch_text(text);
    }

    /// Deliver a `message` frame on `channel` as if it came from the hub.
    pub(crate) fn deliver_for_test(&self, channel: &str, content: Value) {
        let text = Frame::message(channel, content)
            .to_text()
            .expect("frame serializes");
        self.shared.dispatch_text(&text);
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Disposal handle for one handler registration.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    shared: Weak<Shared>,
    channel: String,
    id: HandlerId,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .finish()
    }
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Explicitly unsubscribe. Same as dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.release(&self.channel, self.id);
        }
    }
}
