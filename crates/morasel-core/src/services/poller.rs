//! Channel connection polling.
//!
//! While a user scans the pairing QR code, the channel is re-fetched on a
//! fixed interval until the server reports it online.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::ChannelService;
use crate::models::Channel;

/// Time between two status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Shortest accepted interval; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running connection poll.
///
/// The latest fetched channel is published on a `watch` channel. Fetch
/// errors are logged and skipped, so the last good value stays visible.
/// Dropping the handle cancels the poll.
#[derive(Debug)]
pub struct ConnectionWatch {
    rx: watch::Receiver<Option<Channel>>,
    handle: JoinHandle<()>,
}

impl ConnectionWatch {
    pub(crate) fn spawn(service: ChannelService, id: String, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(poll(service, id, interval, tx));
        Self { rx, handle }
    }

    /// Most recent successfully fetched channel, if any.
    pub fn latest(&self) -> Option<Channel> {
        self.rx.borrow().clone()
    }

    /// Receiver that sees every fetched channel.
    pub fn subscribe(&self) -> watch::Receiver<Option<Channel>> {
        self.rx.clone()
    }

    /// Whether the poll has stopped, either connected or cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop polling. Safe to call more than once.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Wait until the channel is online. Returns `None` if the poll is
    /// cancelled first.
    pub async fn wait_connected(&mut self) -> Option<Channel> {
        loop {
            let current = self.rx.borrow_and_update().clone();
            if let Some(channel) = current.filter(Channel::is_online) {
                return Some(channel);
            }
            if self.rx.changed().await.is_err() {
                // Sender gone: the task finished or was aborted.
                return self.rx.borrow().clone().filter(Channel::is_online);
            }
        }
    }
}

impl Drop for ConnectionWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn poll(
    service: ChannelService,
    id: String,
    interval: Duration,
    tx: watch::Sender<Option<Channel>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match service.get(&id).await {
            Ok(channel) => {
                let online = channel.is_online();
                tx.send_replace(Some(channel));
                if online {
                    info!(id = %id, "Channel connected");
                    return;
                }
            }
            Err(e) => debug!(id = %id, error = %e, "Channel status fetch failed"),
        }
    }
}
