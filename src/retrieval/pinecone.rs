//! Pinecone vector index client
//!
//! Talks to the index's data-plane host directly (`/query`,
//! `/describe_index_stats`). The index is only read here; the offline
//! ingestion job owns writes.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

use super::{IndexMatch, IndexStats, VectorIndex};
use crate::error::MentorError;
use crate::Result;

pub struct PineconeIndex {
    client: Client,
    api_key: String,
    host: String,
}

impl PineconeIndex {
    /// `host` is the index host, e.g. `https://mentor-abc123.svc.us-east1-gcp.pinecone.io`
    pub fn new(api_key: String, host: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        let host = host.trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            client,
            api_key,
            host,
        })
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.api_key.is_empty() || self.host == "https://" {
            return Err(MentorError::VectorSearch(
                "PINECONE_API_KEY / PINECONE_INDEX_HOST not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        self.ensure_configured()?;

        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| MentorError::VectorSearch(format!("{} request failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(%status, path, "Vector index error response: {}", text);
            return Err(MentorError::VectorSearch(format!(
                "HTTP {} for {}: {}",
                status, path, text
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MentorError::VectorSearch(format!("invalid response: {}", e)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    total_vector_count: u64,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let response: QueryResponse = self
            .post(
                "/query",
                &json!({
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": true
                }),
            )
            .await?;

        debug!(matches = response.matches.len(), top_k, "Vector index query complete");

        Ok(response.matches)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let response: DescribeStatsResponse =
            self.post("/describe_index_stats", &json!({})).await?;

        Ok(IndexStats {
            available: true,
            vector_count: response.total_vector_count,
            error: None,
        })
    }
}
