//! Logging Ingestion (`/20200831`) client.

use super::{build_url, ApiError, OciClient};
use crate::alert::{LogIngestion, PutLogsDetails};
use async_trait::async_trait;

const API_VERSION: &str = "/20200831";

pub struct LoggingIngestionClient {
    client: OciClient,
    base: String,
}

impl LoggingIngestionClient {
    pub fn new(client: OciClient, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }
}

#[async_trait]
impl LogIngestion for LoggingIngestionClient {
    async fn put_logs(&self, log_id: &str, details: &PutLogsDetails) -> Result<(), ApiError> {
        let url = build_url(
            &self.base,
            &format!("{}/logs/{}/actions/push", API_VERSION, log_id),
            &[],
        )?;
        self.client.post_accepted(url, details).await?;
        Ok(())
    }
}
