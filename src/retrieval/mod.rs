//! Retrieval pipeline
//!
//! Latest user message → embedding → similarity search → prompt context and
//! citation records. Retrieval failures never abort a chat turn: the
//! pipeline degrades to a fixed "no content" context and no citations.

use crate::error::MentorError;
use crate::models::{Citation, RetrievedPassage, SourceType};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod openai;
pub mod pinecone;

pub use openai::OpenAiEmbedder;
pub use pinecone::PineconeIndex;

/// Context handed to the model when nothing could be retrieved
pub const NO_CONTENT_CONTEXT: &str = "No content retrieved from knowledge base.";

pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 20;

const SNIPPET_CHARS: usize = 200;
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

//
// ================= Collaborators =================
//

/// Turns text into a fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Similarity search over the knowledge base
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;
    async fn stats(&self) -> Result<IndexStats>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: PassageMetadata,
}

/// Metadata stored next to each vector by the ingestion job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PassageMetadata {
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub chunk_index: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub available: bool,
    pub vector_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<IndexMatch> for RetrievedPassage {
    fn from(m: IndexMatch) -> Self {
        let meta = m.metadata;
        RetrievedPassage {
            text: meta.text.unwrap_or_default(),
            score: m.score,
            source_type: meta
                .source_type
                .map(SourceType::from)
                .unwrap_or(SourceType::Unknown),
            title: non_empty(meta.title).unwrap_or_else(|| "Unknown".to_string()),
            speaker: non_empty(meta.speaker),
            url: non_empty(meta.source_url),
            chunk_index: meta
                .chunk_index
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n as u32)
                .unwrap_or(0),
        }
    }
}

//
// ================= Rendering =================
//

/// Number passages `[Source k] [type] title (speaker):` in the order given.
pub fn format_context(passages: &[RetrievedPassage]) -> String {
    if passages.is_empty() {
        return NO_CONTENT_CONTEXT.to_string();
    }

    passages
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let speaker = p
                .speaker
                .as_deref()
                .map(|s| format!(" ({})", s))
                .unwrap_or_default();
            format!(
                "[Source {}] [{}] {}{}:\n{}",
                i + 1,
                p.source_type,
                p.title,
                speaker,
                p.text
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_CHARS {
        let head: String = text.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

pub fn format_citations(passages: &[RetrievedPassage]) -> Vec<Citation> {
    passages
        .iter()
        .map(|p| Citation {
            title: p.title.clone(),
            speaker: p.speaker.clone(),
            url: p.url.clone(),
            source_type: p.source_type,
            relevance_snippet: snippet(&p.text),
        })
        .collect()
}

//
// ================= Pipeline =================
//

/// What the prompt composer and the caller get out of retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub context: String,
    pub citations: Vec<Citation>,
    pub passages: Vec<RetrievedPassage>,
}

impl RetrievedContext {
    pub fn empty() -> Self {
        Self {
            context: NO_CONTENT_CONTEXT.to_string(),
            citations: Vec::new(),
            passages: Vec::new(),
        }
    }

    fn from_passages(passages: Vec<RetrievedPassage>) -> Self {
        if passages.is_empty() {
            return Self::empty();
        }
        Self {
            context: format_context(&passages),
            citations: format_citations(&passages),
            passages,
        }
    }
}

#[derive(Clone)]
pub struct RetrievalPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    embed_timeout: Duration,
    search_timeout: Duration,
}

impl RetrievalPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            embed_timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeouts(mut self, embed_timeout: Duration, search_timeout: Duration) -> Self {
        self.embed_timeout = embed_timeout;
        self.search_timeout = search_timeout;
        self
    }

    pub fn clamp_top_k(top_k: usize) -> usize {
        top_k.clamp(1, MAX_TOP_K)
    }

    /// Embed and search, surfacing failures. Matches come back sorted by
    /// descending score.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        let top_k = Self::clamp_top_k(top_k);

        let vector = tokio::time::timeout(self.embed_timeout, self.embedder.embed(query))
            .await
            .map_err(|_| MentorError::RetrievalTimeout(self.embed_timeout.as_secs()))??;

        debug!(dimensions = vector.len(), top_k, "Query embedded");

        let matches = tokio::time::timeout(self.search_timeout, self.index.search(&vector, top_k))
            .await
            .map_err(|_| MentorError::RetrievalTimeout(self.search_timeout.as_secs()))??;

        let mut passages: Vec<RetrievedPassage> =
            matches.into_iter().map(RetrievedPassage::from).collect();
        passages.sort_by(|a, b| b.score.total_cmp(&a.score));
        passages.truncate(top_k);

        Ok(passages)
    }

    /// Retrieve context for a query, degrading to the empty context on any
    /// failure, timeout or cancellation.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> RetrievedContext {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MentorError::Cancelled),
            result = self.search(query, top_k) => result,
        };

        match outcome {
            Ok(passages) => {
                info!(passages = passages.len(), "Knowledge base retrieval complete");
                RetrievedContext::from_passages(passages)
            }
            Err(e) => {
                warn!(error = %e, "Knowledge base retrieval failed, continuing without context");
                RetrievedContext::empty()
            }
        }
    }

    pub async fn index_stats(&self) -> IndexStats {
        match tokio::time::timeout(self.search_timeout, self.index.stats()).await {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => IndexStats {
                available: false,
                vector_count: 0,
                error: Some(e.to_string()),
            },
            Err(_) => IndexStats {
                available: false,
                vector_count: 0,
                error: Some(MentorError::RetrievalTimeout(self.search_timeout.as_secs()).to_string()),
            },
        }
    }
}
