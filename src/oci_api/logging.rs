//! Logging Management (`/20200531`) client.

use super::{build_url, ApiError, OciClient};
use crate::provisioning::{LoggingManagement, ManagedEntity};
use async_trait::async_trait;
use serde::Serialize;

const API_VERSION: &str = "/20200531";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogGroupDetails<'a> {
    compartment_id: &'a str,
    display_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogDetails<'a> {
    display_name: &'a str,
    log_type: &'static str,
}

pub struct LoggingManagementClient {
    client: OciClient,
    base: String,
}

impl LoggingManagementClient {
    pub fn new(client: OciClient, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<url::Url, ApiError> {
        build_url(&self.base, &format!("{}{}", API_VERSION, path), query)
    }
}

#[async_trait]
impl LoggingManagement for LoggingManagementClient {
    async fn list_log_groups(
        &self,
        compartment_id: &str,
        display_name: &str,
    ) -> Result<Vec<ManagedEntity>, ApiError> {
        let url = self.url(
            "/logGroups",
            &[("compartmentId", compartment_id), ("displayName", display_name)],
        )?;
        Ok(self.client.get::<Vec<ManagedEntity>>(url).await?.body)
    }

    async fn create_log_group(
        &self,
        compartment_id: &str,
        display_name: &str,
    ) -> Result<(), ApiError> {
        let url = self.url("/logGroups", &[])?;
        let work_request = self
            .client
            .post_accepted(
                url,
                &CreateLogGroupDetails {
                    compartment_id,
                    display_name,
                },
            )
            .await?;
        tracing::debug!(work_request = ?work_request, display_name, "log group creation accepted");
        Ok(())
    }

    async fn get_log_group(&self, log_group_id: &str) -> Result<ManagedEntity, ApiError> {
        let url = self.url(&format!("/logGroups/{}", log_group_id), &[])?;
        Ok(self.client.get::<ManagedEntity>(url).await?.body)
    }

    async fn list_logs(
        &self,
        log_group_id: &str,
        display_name: &str,
    ) -> Result<Vec<ManagedEntity>, ApiError> {
        let url = self.url(
            &format!("/logGroups/{}/logs", log_group_id),
            &[("displayName", display_name)],
        )?;
        Ok(self.client.get::<Vec<ManagedEntity>>(url).await?.body)
    }

    async fn create_log(&self, log_group_id: &str, display_name: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/logGroups/{}/logs", log_group_id), &[])?;
        let work_request = self
            .client
            .post_accepted(
                url,
                &CreateLogDetails {
                    display_name,
                    log_type: "CUSTOM",
                },
            )
            .await?;
        tracing::debug!(work_request = ?work_request, display_name, "log creation accepted");
        Ok(())
    }

    async fn get_log(&self, log_group_id: &str, log_id: &str) -> Result<ManagedEntity, ApiError> {
        let url = self.url(&format!("/logGroups/{}/logs/{}", log_group_id, log_id), &[])?;
        Ok(self.client.get::<ManagedEntity>(url).await?.body)
    }
}
