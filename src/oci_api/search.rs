//! Resource Search (`/20180409`) client.

use super::{build_url, ApiError, OciClient};
use crate::inventory::{KeyResource, ResourceSearch, SearchPage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "/20180409";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredSearchDetails<'a> {
    #[serde(rename = "type")]
    search_type: &'static str,
    query: &'a str,
    matching_context_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ResourceSummaryCollection {
    #[serde(default)]
    items: Vec<KeyResource>,
}

pub struct SearchClient {
    client: OciClient,
    base: String,
}

impl SearchClient {
    pub fn new(client: OciClient, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }
}

#[async_trait]
impl ResourceSearch for SearchClient {
    async fn search_page(&self, query: &str, page: Option<&str>) -> Result<SearchPage, ApiError> {
        let params: Vec<(&str, &str)> = page.map(|p| vec![("page", p)]).unwrap_or_default();
        let url = build_url(&self.base, &format!("{}/resources", API_VERSION), &params)?;
        let details = StructuredSearchDetails {
            search_type: "Structured",
            query,
            matching_context_type: "NONE",
        };

        let response = self
            .client
            .post::<_, ResourceSummaryCollection>(url, &details)
            .await?;

        Ok(SearchPage {
            items: response.body.items,
            next_page: response.next_page,
        })
    }
}
