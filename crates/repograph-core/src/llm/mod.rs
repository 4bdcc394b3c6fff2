//! Language-model collaborator interface.
//!
//! The agent loop only depends on [`ToolModel`], so tests inject a
//! scripted fake; [`GeminiClient`] is the production implementation.

mod error;
mod gemini;

pub use error::LlmError;
pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde_json::Value;

/// A capability the model may request, as a JSON-schema declaration.
#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One requested capability invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// One turn of the conversation, from either side.
#[derive(Debug, Clone)]
pub enum Message {
    /// The user's question.
    User { text: String },

    /// A model turn: final text, tool calls, or both.
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolCall>,
    },

    /// The result of executing one tool call, fed back to the model.
    ToolResult { name: String, content: Value },
}

/// What the model produced in one turn.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelTurn {
    /// A turn with no tool calls is terminal; its text is the answer.
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// A language model that supports tool calling.
#[async_trait]
pub trait ToolModel: Send + Sync {
    /// Send the conversation and declared tools, get the next turn.
    async fn generate(
        &self,
        system: &str,
        tools: &[ToolDeclaration],
        history: &[Message],
    ) -> Result<ModelTurn, LlmError>;
}
