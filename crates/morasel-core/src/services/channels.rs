use std::time::Duration;

use tracing::info;

use super::poller::{ConnectionWatch, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
use crate::api::envelope::{decode, decode_list};
use crate::api::{ApiClient, ApiError};
use crate::models::{Channel, NewChannel};

/// `/channels` endpoints.
#[derive(Debug, Clone)]
pub struct ChannelService {
    client: ApiClient,
    poll_interval: Duration,
}

impl ChannelService {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Interval used by `watch_connection`, floored at `MIN_POLL_INTERVAL`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn list(&self) -> Result<Vec<Channel>, ApiError> {
        let body = self.client.get("/channels").await?;
        Ok(decode_list(body))
    }

    /// Create a channel. The response carries the QR code to pair it.
    pub async fn create(&self, name: &str, phone_number: &str) -> Result<Channel, ApiError> {
        info!(name = %name, "Creating channel");
        let request = NewChannel {
            name: name.to_string(),
            phone_number: phone_number.to_string(),
        };
        let body = self.client.post("/channels", &request).await?;
        decode(body)
    }

    pub async fn get(&self, id: &str) -> Result<Channel, ApiError> {
        let body = self.client.get(&format!("/channels/{}", id)).await?;
        decode(body)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        info!(id = %id, "Deleting channel");
        self.client.delete(&format!("/channels/{}", id)).await
    }

    /// Poll the channel until it comes online. Must be called inside a
    /// Tokio runtime; the returned handle stops the poll when dropped.
    pub fn watch_connection(&self, id: &str) -> ConnectionWatch {
        ConnectionWatch::spawn(self.clone(), id.to_string(), self.poll_interval)
    }
}
