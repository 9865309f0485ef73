use crate::domain::ports::Notifier;
use crate::utils::error::{EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// POST `{"readingId": …}` 到外部通知端點（寄信等流程由對方處理）
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn reading_created(&self, reading_id: &str) -> Result<()> {
        debug!("Posting reading notification to: {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "readingId": reading_id }))
            .send()
            .await?;

        debug!("Notification response status: {}", response.status());
        if !response.status().is_success() {
            return Err(EngineError::persistence(format!(
                "notification endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// 沒有設定 endpoint 時使用，只寫 log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn reading_created(&self, reading_id: &str) -> Result<()> {
        info!("Reading {} stored", reading_id);
        Ok(())
    }
}
