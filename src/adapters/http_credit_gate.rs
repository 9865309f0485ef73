use crate::domain::model::{CreditStatus, UserId};
use crate::domain::ports::CreditGate;
use crate::utils::error::{EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// 遠端餘額查詢：`GET {base}/credits/status?userId=&readingTypeKey=`
pub struct HttpCreditGate {
    client: Client,
    status_url: Url,
}

impl HttpCreditGate {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| EngineError::InvalidConfigValueError {
            field: "credits.endpoint".to_string(),
            value: base_url.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        let status_url = base
            .join(&format!("{}/credits/status", base.path().trim_end_matches('/')))
            .map_err(|e| EngineError::config(format!("cannot build credit status URL: {}", e)))?;

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            status_url,
        })
    }
}

#[async_trait]
impl CreditGate for HttpCreditGate {
    async fn get_status(&self, user_id: &UserId, reading_type_key: &str) -> Result<CreditStatus> {
        debug!("Checking credits at: {}", self.status_url);
        let response = self
            .client
            .get(self.status_url.clone())
            .query(&[("userId", user_id.as_str()), ("readingTypeKey", reading_type_key)])
            .send()
            .await?
            .error_for_status()?;

        let status: CreditStatus = response.json().await?;
        debug!(
            "Credit status for {} / {}: enough={}, required={}",
            user_id, reading_type_key, status.has_enough_credits, status.required_credits
        );
        Ok(status)
    }
}
