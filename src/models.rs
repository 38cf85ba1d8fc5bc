//! Core data models for the mentor service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MentorError;
use crate::Result;

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A validated conversation whose final entry is the user's question.
#[derive(Debug, Clone)]
pub struct Query {
    history: Vec<ChatMessage>,
}

impl Query {
    /// Validate an ordered conversation. Order is kept exactly as given.
    pub fn from_messages(history: Vec<ChatMessage>) -> Result<Self> {
        let Some(last) = history.last() else {
            return Err(MentorError::validation("No messages provided"));
        };

        if last.role != Role::User {
            return Err(MentorError::validation("Last message must be from user"));
        }

        if last.content.trim().is_empty() {
            return Err(MentorError::validation("Last user message is empty"));
        }

        Ok(Self { history })
    }

    /// Text of the latest user message; used as the retrieval query.
    pub fn text(&self) -> &str {
        self.history
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}

//
// ================= User Profile =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VentureStage {
    Exploring,
    Validating,
    Prototype,
    Revenue,
}

impl VentureStage {
    pub fn description(&self) -> &'static str {
        match self {
            VentureStage::Exploring => "Exploring ideas (no specific venture yet)",
            VentureStage::Validating => {
                "Validating an idea (talking to customers, testing assumptions)"
            }
            VentureStage::Prototype => "Building a prototype/MVP",
            VentureStage::Revenue => "Has paying customers (generating revenue)",
        }
    }
}

/// Declared attributes of the person asking. Read-only snapshot per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub stage: VentureStage,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub is_f1_visa: Option<bool>,
    #[serde(default)]
    pub has_co_founders: Option<bool>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub has_runway: Option<bool>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(stage: VentureStage) -> Self {
        Self {
            stage,
            major: None,
            industry: None,
            is_f1_visa: None,
            has_co_founders: None,
            timeline: None,
            has_runway: None,
            last_updated: None,
        }
    }
}

//
// ================= Retrieval =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum SourceType {
    Transcript,
    InstitutionalResource,
    Framework,
    Unknown,
}

impl From<String> for SourceType {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().as_str() {
            "transcript" => SourceType::Transcript,
            "institutional_resource" | "asu_resource" | "resource" => {
                SourceType::InstitutionalResource
            }
            "framework" => SourceType::Framework,
            _ => SourceType::Unknown,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceType::Transcript => "transcript",
            SourceType::InstitutionalResource => "institutional_resource",
            SourceType::Framework => "framework",
            SourceType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A scored passage returned by the similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedPassage {
    pub text: String,
    pub score: f32,
    pub source_type: SourceType,
    pub title: String,
    pub speaker: Option<String>,
    pub url: Option<String>,
    pub chunk_index: u32,
}

/// Citation record handed back to the caller alongside the answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub relevance_snippet: String,
}

//
// ================= Chat Result =================
//

/// One calculator invocation made while answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub sources: Vec<Citation>,
    pub tool_calls: Vec<ToolCallRecord>,
}
