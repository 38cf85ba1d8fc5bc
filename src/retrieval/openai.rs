//! OpenAI embeddings client
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::Embedder;
use crate::error::MentorError;
use crate::Result;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Reusable embeddings client (connection-pooled)
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.api_key.is_empty() {
            return Err(MentorError::Embedding(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| MentorError::Embedding(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Embedding API error response: {}", body);
            return Err(MentorError::Embedding(format!("HTTP {}: {}", status, body)));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| MentorError::Embedding(format!("invalid response: {}", e)))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MentorError::Embedding("empty embedding returned".to_string()))?;

        debug!(model = %self.model, dimensions = embedding.len(), "Embedding received");

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_embed_parses_vector() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(body["model"], "text-embedding-3-small");
                assert_eq!(body["input"], "what is CAC?");
                Json(json!({ "data": [{ "embedding": [0.25, -0.5, 1.0], "index": 0 }] }))
            }),
        );
        let base = serve(router).await;

        let embedder =
            OpenAiEmbedder::new("sk-test".into(), &base, DEFAULT_EMBEDDING_MODEL).unwrap();
        let vector = embedder.embed("what is CAC?").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_surfaces_http_errors() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(router).await;

        let embedder = OpenAiEmbedder::new("sk-test".into(), &base, "m").unwrap();
        let err = embedder.embed("q").await.unwrap_err();
        assert!(matches!(err, MentorError::Embedding(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let embedder = OpenAiEmbedder::new(String::new(), "http://127.0.0.1:9", "m").unwrap();
        let err = embedder.embed("q").await.unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
