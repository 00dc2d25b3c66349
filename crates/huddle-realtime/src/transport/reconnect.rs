//! Opt-in reconnect supervisor with exponential backoff.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::client::Transport;
use super::types::ConnectionState;
use crate::session::SessionCredential;

/// Backoff bounds for [`spawn_reconnector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay that follows `current`, doubling up to `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_delay)
    }
}

/// Watch the transport and call `connect` again whenever it drops.
///
/// The delay starts at `base_delay`, doubles after every attempt, and resets
/// once a connection opens. The task ends when the transport is shut down.
pub fn spawn_reconnector(
    transport: Transport,
    credential: SessionCredential,
    policy: ReconnectPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut state_rx = transport.watch_state();
        let mut delay = policy.base_delay;

        loop {
            let state = *state_rx.borrow_and_update();
            match state {
                ConnectionState::Closed => {
                    debug!("Transport closed, reconnector exiting");
                    return;
                }
                ConnectionState::Open => delay = policy.base_delay,
                ConnectionState::Connecting => {}
                ConnectionState::Disconnected => {
                    info!(delay_secs = delay.as_secs_f64(), "Reconnecting after delay");
                    tokio::time::sleep(delay).await;
                    delay = policy.next_delay(delay);
                    transport.connect(Some(&credential));
                    // connect() refused to start; try again after the next delay.
                    if transport.state() == ConnectionState::Disconnected {
                        continue;
                    }
                }
            }
            if state_rx.changed().await.is_err() {
                return;
            }
        }
    })
}
