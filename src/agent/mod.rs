//! Chat orchestrator - runs one request through the mentor loop
//!
//! RETRIEVE → COMPOSE → COMPLETE ⇄ TOOL → ANSWER
//!
//! Retrieval happens once before the loop. Each round is one completion
//! call; a tool request runs the calculator in-process and feeds the result
//! back. The loop is capped so a model that never stops asking for tools
//! becomes an error instead of a hang.

use crate::config::{MentorConfig, DEFAULT_MAX_TOOL_ROUNDS};
use crate::error::MentorError;
use crate::llm::{AnthropicClient, CompletionService, ContentBlock, ConversationMessage, ModelTurn, ToolCall};
use crate::models::{ChatMessage, ChatResponse, Query, ToolCallRecord, UserProfile};
use crate::prompts::build_system_prompt;
use crate::retrieval::{OpenAiEmbedder, PineconeIndex, RetrievalPipeline, DEFAULT_TOP_K};
use crate::tools::{create_default_registry, ToolDefinition, ToolOutput, ToolRegistry};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Returned when the model's final response has no text in it
pub const FALLBACK_ANSWER: &str = "I'm sorry, I couldn't generate a response.";

/// A validated chat request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub query: Query,
    pub profile: Option<UserProfile>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>, profile: Option<UserProfile>) -> Result<Self> {
        Ok(Self {
            query: Query::from_messages(messages)?,
            profile,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub max_tool_rounds: u32,
    pub completion_timeout: Duration,
    pub top_k: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            completion_timeout: Duration::from_secs(60),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl From<&MentorConfig> for LoopSettings {
    fn from(config: &MentorConfig) -> Self {
        Self {
            max_tool_rounds: config.max_tool_rounds,
            completion_timeout: config.completion_timeout,
            top_k: config.top_k,
        }
    }
}

/// Messages and tool records accumulated during one request
struct ConversationTurn {
    messages: Vec<ConversationMessage>,
    tool_calls: Vec<ToolCallRecord>,
}

impl ConversationTurn {
    fn new(history: &[ChatMessage]) -> Self {
        Self {
            messages: history.iter().map(ConversationMessage::from).collect(),
            tool_calls: Vec::new(),
        }
    }

    fn rounds(&self) -> u32 {
        self.tool_calls.len() as u32
    }

    /// Append the model's tool request and the matching tool result.
    fn record_tool_round(
        &mut self,
        assistant: Vec<ContentBlock>,
        call: ToolCall,
        output: ToolOutput,
    ) -> Result<()> {
        let payload = serde_json::to_string(&output.data)?;

        self.messages.push(ConversationMessage::assistant_blocks(assistant));
        self.messages.push(ConversationMessage::tool_results(vec![
            ContentBlock::tool_result(call.id, payload, !output.success),
        ]));

        self.tool_calls.push(ToolCallRecord {
            name: call.name,
            input: call.input,
            output: output.data,
            success: output.success,
        });

        Ok(())
    }
}

/// Main orchestrator that coordinates retrieval, the model and the calculator
pub struct Orchestrator {
    retrieval: RetrievalPipeline,
    completion: Arc<dyn CompletionService>,
    registry: ToolRegistry,
    settings: LoopSettings,
}

impl Orchestrator {
    pub fn new(
        retrieval: RetrievalPipeline,
        completion: Arc<dyn CompletionService>,
        registry: ToolRegistry,
    ) -> Self {
        Self {
            retrieval,
            completion,
            registry,
            settings: LoopSettings::default(),
        }
    }

    /// Wire the production collaborators. Each client is built once and
    /// shared for the life of the process.
    pub fn from_config(config: &MentorConfig) -> Result<Self> {
        let embedder = OpenAiEmbedder::new(
            config.openai_api_key.clone(),
            &config.openai_base_url,
            &config.embedding_model,
        )?;
        let index = PineconeIndex::new(config.pinecone_api_key.clone(), &config.pinecone_index_host)?;
        let retrieval = RetrievalPipeline::new(Arc::new(embedder), Arc::new(index))
            .with_timeouts(config.embedding_timeout, config.search_timeout);

        let completion = AnthropicClient::new(
            config.anthropic_api_key.clone(),
            &config.anthropic_base_url,
            &config.anthropic_model,
            config.max_tokens,
        )?;

        Ok(Self::new(retrieval, Arc::new(completion), create_default_registry())
            .with_settings(LoopSettings::from(config)))
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn retrieval(&self) -> &RetrievalPipeline {
        &self.retrieval
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Run a request to completion with no external cancellation.
    pub async fn run(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.run_cancellable(request, &CancellationToken::new()).await
    }

    /// Run a request, aborting promptly once `cancel` fires.
    pub async fn run_cancellable(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        let request_id = Uuid::new_v4();
        let span = info_span!("chat", request_id = %request_id);

        self.run_inner(request, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        let start_time = Instant::now();
        let ChatRequest { query, profile } = request;

        info!(
            history = query.history().len(),
            has_profile = profile.is_some(),
            "Orchestrator: starting chat turn"
        );

        // === RETRIEVE ===
        let retrieved = self
            .retrieval
            .retrieve(query.text(), self.settings.top_k, cancel)
            .await;

        if cancel.is_cancelled() {
            return Err(MentorError::Cancelled);
        }

        // === COMPOSE ===
        let system = build_system_prompt(profile.as_ref(), &retrieved.context);
        let tools = self.registry.definitions();
        let mut turn = ConversationTurn::new(query.history());

        // === COMPLETE ⇄ TOOL ===
        loop {
            let round = turn.rounds();
            debug!(round, messages = turn.messages.len(), "Requesting completion");

            match self.complete(&system, &turn.messages, &tools, cancel).await? {
                ModelTurn::FinalText(text) => {
                    let message = text
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| FALLBACK_ANSWER.to_string());

                    info!(
                        rounds = round,
                        sources = retrieved.citations.len(),
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Chat turn complete"
                    );

                    return Ok(ChatResponse {
                        message,
                        sources: retrieved.citations,
                        tool_calls: turn.tool_calls,
                    });
                }
                ModelTurn::ToolRequest { assistant, call } => {
                    if round >= self.settings.max_tool_rounds {
                        error!(
                            rounds = round,
                            tool = %call.name,
                            "Model kept requesting tools past the round limit"
                        );
                        return Err(MentorError::MaxToolRounds(self.settings.max_tool_rounds));
                    }

                    let output = self.registry.dispatch(&call.name, &call.input);
                    info!(round = round + 1, tool = %call.name, success = output.success, "Tool round");

                    turn.record_tool_round(assistant, call, output)?;
                }
            }
        }
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<ModelTurn> {
        let timeout = self.settings.completion_timeout;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MentorError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.completion.complete(system, messages, tools)) => outcome,
        };

        match outcome {
            Ok(Ok(turn)) => Ok(turn),
            Ok(Err(e)) => {
                error!(error = %e, "Completion service failed");
                Err(e)
            }
            Err(_) => {
                error!(timeout_secs = timeout.as_secs(), "Completion service timed out");
                Err(MentorError::CompletionTimeout(timeout.as_secs()))
            }
        }
    }
}
