//! Runtime configuration read from the process environment
//!
//! Binaries call `dotenv::dotenv().ok()` first so a local `.env` file can
//! supply any of these.

use std::str::FromStr;
use std::time::Duration;

use crate::error::MentorError;
use crate::llm::anthropic::{DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::retrieval::openai::DEFAULT_EMBEDDING_MODEL;
use crate::retrieval::DEFAULT_TOP_K;
use crate::Result;

pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 5;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct MentorConfig {
    // Completion service
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub max_tokens: u32,

    // Retrieval
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub pinecone_api_key: String,
    pub pinecone_index_host: String,
    pub top_k: usize,

    // Loop and timeouts
    pub max_tool_rounds: u32,
    pub embedding_timeout: Duration,
    pub search_timeout: Duration,
    pub completion_timeout: Duration,

    pub port: u16,
}

impl MentorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset and blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port_raw = get("PORT").or_else(|| get("API_PORT"));

        Ok(Self {
            anthropic_api_key: text("ANTHROPIC_API_KEY", ""),
            anthropic_model: text("ANTHROPIC_MODEL", DEFAULT_MODEL),
            anthropic_base_url: text("ANTHROPIC_BASE_URL", DEFAULT_ANTHROPIC_BASE_URL),
            max_tokens: parse_number("ANTHROPIC_MAX_TOKENS", get("ANTHROPIC_MAX_TOKENS"), DEFAULT_MAX_TOKENS)?,

            openai_api_key: text("OPENAI_API_KEY", ""),
            openai_base_url: text("OPENAI_BASE_URL", "https://api.openai.com"),
            embedding_model: text("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            pinecone_api_key: text("PINECONE_API_KEY", ""),
            pinecone_index_host: text("PINECONE_INDEX_HOST", ""),
            top_k: parse_number("RETRIEVAL_TOP_K", get("RETRIEVAL_TOP_K"), DEFAULT_TOP_K)?,

            max_tool_rounds: parse_number("MAX_TOOL_ROUNDS", get("MAX_TOOL_ROUNDS"), DEFAULT_MAX_TOOL_ROUNDS)?,
            embedding_timeout: seconds("EMBEDDING_TIMEOUT_SECS", get("EMBEDDING_TIMEOUT_SECS"), 10)?,
            search_timeout: seconds("SEARCH_TIMEOUT_SECS", get("SEARCH_TIMEOUT_SECS"), 10)?,
            completion_timeout: seconds("COMPLETION_TIMEOUT_SECS", get("COMPLETION_TIMEOUT_SECS"), 60)?,

            port: parse_number("PORT", port_raw, DEFAULT_PORT)?,
        })
    }

    /// The server cannot answer anything without the completion service.
    pub fn require_completion_key(&self) -> Result<()> {
        if self.anthropic_api_key.is_empty() {
            return Err(MentorError::Config("ANTHROPIC_API_KEY is not set".to_string()));
        }
        Ok(())
    }

    /// Retrieval degrades per call when these are missing; callers only log it.
    pub fn retrieval_configured(&self) -> bool {
        !self.openai_api_key.is_empty()
            && !self.pinecone_api_key.is_empty()
            && !self.pinecone_index_host.is_empty()
    }
}

fn parse_number<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| MentorError::Config(format!("{} must be a number, got '{}'", key, value))),
    }
}

fn seconds(key: &str, raw: Option<String>, default: u64) -> Result<Duration> {
    let secs: u64 = parse_number(key, raw, default)?;
    if secs == 0 {
        return Err(MentorError::Config(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}
