//! Record publishers
//!
//! Delivery is at most once: a failed publish is reported to the caller and
//! the record is not retried or queued.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::PublishError;
use crate::record::MeasurementRecord;

/// Destination for finished measurement records
pub trait Publisher {
    fn publish(
        &self,
        record: &MeasurementRecord,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Posts records as JSON to the storage endpoint
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    url: String,
}

impl HttpPublisher {
    /// Create a publisher posting to `url`, giving up on a request after `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Publisher for HttpPublisher {
    async fn publish(&self, record: &MeasurementRecord) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        debug!("Endpoint {} answered {}", self.url, status);
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(PublishError::Status(status.as_u16()))
        }
    }
}

/// Sends records over an in-process channel
///
/// Useful for embedding the engine and for tests.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<MeasurementRecord>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MeasurementRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Publisher for ChannelPublisher {
    async fn publish(&self, record: &MeasurementRecord) -> Result<(), PublishError> {
        self.tx
            .send(record.clone())
            .map_err(|_| PublishError::Closed)
    }
}
