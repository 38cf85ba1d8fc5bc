//! Completion service abstraction
//!
//! Provider wire shapes are decoded once into [`ModelTurn`] so the
//! orchestration loop never inspects stop reasons or block lists itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ChatMessage, Role};
use crate::tools::ToolDefinition;
use crate::Result;

pub mod anthropic;

pub use anthropic::AnthropicClient;

//
// ================= Message Blocks =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },

    /// Block kinds this service never acts on (thinking, server tools, ...)
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: is_error.then_some(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One entry of the history sent to the completion service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ConversationMessage {
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    pub fn tool_results(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }
}

impl From<&ChatMessage> for ConversationMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: MessageContent::Text(message.content.clone()),
        }
    }
}

//
// ================= Decoded Turn =================
//

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// What the model asked for on one round
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// The model wants a tool run. `assistant` is its message with only the
    /// answered tool-use block kept; it is echoed back before the tool result.
    ToolRequest {
        assistant: Vec<ContentBlock>,
        call: ToolCall,
    },
    /// Final answer; `None` when the response carried no text block.
    FinalText(Option<String>),
}

pub const STOP_REASON_TOOL_USE: &str = "tool_use";

/// Decode a provider response. Only a `tool_use` stop reason continues the
/// loop, and then only the first tool-use block is acted on. Every other
/// tool-use block is dropped from the echoed message, since each one left
/// in the history would need its own tool result.
pub fn decode_turn(content: Vec<ContentBlock>, stop_reason: Option<&str>) -> ModelTurn {
    if stop_reason == Some(STOP_REASON_TOOL_USE) {
        let call = content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        });

        if let Some(call) = call {
            let assistant = content
                .into_iter()
                .filter(|block| match block {
                    ContentBlock::ToolUse { id, .. } => *id == call.id,
                    ContentBlock::Unsupported => false,
                    _ => true,
                })
                .collect();
            return ModelTurn::ToolRequest { assistant, call };
        }
    }

    let text = content.into_iter().find_map(|block| match block {
        ContentBlock::Text { text } => Some(text),
        _ => None,
    });

    ModelTurn::FinalText(text)
}

/// A language model that can answer or ask for a tool
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::MentorError;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    pub(crate) enum Step {
        Reply(ModelTurn),
        Fail(MentorError),
        Stall(Duration),
    }

    /// Completion stub that plays back a fixed script of turns and records
    /// the history it was shown on each call.
    pub(crate) struct ScriptedCompletion {
        steps: Mutex<VecDeque<Step>>,
        repeat: Option<ModelTurn>,
        pub seen: Mutex<Vec<Vec<ConversationMessage>>>,
        pub systems: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        pub fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                repeat: None,
                seen: Mutex::new(Vec::new()),
                systems: Mutex::new(Vec::new()),
            }
        }

        /// Answer every call with the same turn.
        pub fn always(turn: ModelTurn) -> Self {
            Self {
                repeat: Some(turn),
                ..Self::new(Vec::new())
            }
        }

        pub fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(
            &self,
            system: &str,
            messages: &[ConversationMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ModelTurn> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.systems.lock().unwrap().push(system.to_string());

            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Reply(turn)) => Ok(turn),
                Some(Step::Fail(err)) => Err(err),
                Some(Step::Stall(delay)) => {
                    tokio::time::sleep(delay).await;
                    Ok(ModelTurn::FinalText(Some("too late".into())))
                }
                None => self
                    .repeat
                    .clone()
                    .ok_or_else(|| MentorError::completion(None, "script exhausted")),
            }
        }
    }

    pub(crate) fn tool_turn(id: &str, name: &str, input: Value) -> ModelTurn {
        ModelTurn::ToolRequest {
            assistant: vec![
                ContentBlock::text("Let me run the numbers."),
                ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: input.clone(),
                },
            ],
            call: ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                input,
            },
        }
    }

    pub(crate) fn text_turn(text: &str) -> ModelTurn {
        ModelTurn::FinalText(Some(text.to_string()))
    }

    #[test]
    fn test_decode_tool_request_uses_first_tool_block() {
        let content: Vec<ContentBlock> = serde_json::from_value(json!([
            { "type": "text", "text": "Running both." },
            { "type": "tool_use", "id": "toolu_1", "name": "calculate", "input": { "calculation_type": "runway" } },
            { "type": "tool_use", "id": "toolu_2", "name": "calculate", "input": {} }
        ]))
        .unwrap();

        match decode_turn(content, Some("tool_use")) {
            ModelTurn::ToolRequest { assistant, call } => {
                assert_eq!(assistant.len(), 2);
                assert_eq!(assistant[0], ContentBlock::text("Running both."));
                assert!(matches!(&assistant[1], ContentBlock::ToolUse { id, .. } if id == "toolu_1"));
                assert_eq!(call.id, "toolu_1");
                assert_eq!(call.input["calculation_type"], "runway");
            }
            other => panic!("expected tool request, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_final_text() {
        let content = vec![ContentBlock::text("Talk to customers.")];
        assert_eq!(
            decode_turn(content, Some("end_turn")),
            ModelTurn::FinalText(Some("Talk to customers.".into()))
        );

        // tool_use stop reason without a tool block cannot continue
        assert_eq!(decode_turn(vec![], Some("tool_use")), ModelTurn::FinalText(None));
    }

    #[test]
    fn test_tool_blocks_ignored_without_tool_use_stop() {
        let content = vec![ContentBlock::ToolUse {
            id: "toolu_1".into(),
            name: "calculate".into(),
            input: json!({}),
        }];
        assert_eq!(decode_turn(content, Some("max_tokens")), ModelTurn::FinalText(None));
    }

    #[test]
    fn test_unknown_block_types_deserialize() {
        let content: Vec<ContentBlock> = serde_json::from_value(json!([
            { "type": "thinking", "thinking": "hmm", "signature": "abc" },
            { "type": "text", "text": "Answer" }
        ]))
        .unwrap();
        assert_eq!(content[0], ContentBlock::Unsupported);
        assert_eq!(decode_turn(content, None), ModelTurn::FinalText(Some("Answer".into())));
    }

    #[test]
    fn test_tool_result_serialization() {
        let ok = serde_json::to_value(ContentBlock::tool_result("toolu_1", "{}", false)).unwrap();
        assert_eq!(ok, json!({ "type": "tool_result", "tool_use_id": "toolu_1", "content": "{}" }));

        let failed = serde_json::to_value(ContentBlock::tool_result("toolu_1", "{}", true)).unwrap();
        assert_eq!(failed["is_error"], true);

        let message = ConversationMessage::from(&ChatMessage::user("hi"));
        assert_eq!(
            serde_json::to_value(message).unwrap(),
            json!({ "role": "user", "content": "hi" })
        );
    }
}
