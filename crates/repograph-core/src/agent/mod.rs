//! Tool-calling orchestration loop.
//!
//! One question, one conversation: the model is given a fixed system
//! instruction, the single `execute_cypher_query` capability, and the
//! question. Each turn either requests queries (executed through the
//! gateway, results fed back) or carries the final answer. The loop is
//! bounded by a round limit and a cancellation token so a model/tool
//! ping-pong can never run away.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::gateway::{GatewayError, QueryExecutor};
use crate::llm::{LlmError, Message, ToolDeclaration, ToolModel};

/// Name of the single declared capability.
pub const TOOL_NAME: &str = "execute_cypher_query";

/// Errors fatal to one question. Gateway errors are not here: they are
/// fed back to the model as correctable tool errors.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("No answer after {0} tool-call rounds")]
    RoundLimit(usize),

    #[error("Question was cancelled")]
    Cancelled,
}

/// Drives the model/gateway loop for natural-language questions.
pub struct AgentOrchestrator {
    model: Arc<dyn ToolModel>,
    executor: Arc<dyn QueryExecutor>,
    system_prompt: String,
    max_rounds: usize,
}

impl AgentOrchestrator {
    pub fn new(
        model: Arc<dyn ToolModel>,
        executor: Arc<dyn QueryExecutor>,
        system_prompt: impl Into<String>,
        max_rounds: usize,
    ) -> Self {
        Self {
            model,
            executor,
            system_prompt: system_prompt.into(),
            max_rounds,
        }
    }

    /// Answer a question, running until the model stops requesting tool
    /// calls or the round limit is hit.
    pub async fn answer(&self, question: &str) -> Result<String, AgentError> {
        self.answer_with_cancellation(question, &CancellationToken::new())
            .await
    }

    /// Like [`answer`](Self::answer), but checks the token once per
    /// round so a caller can abort without waiting out the round budget.
    pub async fn answer_with_cancellation(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let tools = [tool_declaration()];
        let mut history = vec![Message::User {
            text: question.to_string(),
        }];

        for round in 0..self.max_rounds {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let turn = self
                .model
                .generate(&self.system_prompt, &tools, &history)
                .await?;

            if turn.is_final() {
                return Ok(turn.text.unwrap_or_default());
            }

            tracing::debug!(
                "Round {}: {} tool call(s) requested",
                round,
                turn.tool_calls.len()
            );

            let tool_calls = turn.tool_calls.clone();
            history.push(Message::Assistant {
                text: turn.text,
                tool_calls: turn.tool_calls,
            });

            // Tool calls run sequentially; each response is appended
            // before the next model turn
            for call in tool_calls {
                let content = self.run_tool_call(&call.name, &call.args).await;
                history.push(Message::ToolResult {
                    name: call.name,
                    content,
                });
            }
        }

        Err(AgentError::RoundLimit(self.max_rounds))
    }

    /// Execute one requested invocation and package the outcome (result
    /// or error) as the tool response content.
    async fn run_tool_call(&self, name: &str, args: &Value) -> Value {
        if name != TOOL_NAME {
            return json!({ "error": format!("Unknown tool {}", name) });
        }

        let query = args
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();

        // Known model mistake: the schema has no file_name property
        let query = query.replace("file_name", "file_path");

        match self.executor.execute(&query, None).await {
            Ok(results) => json!({ "results": results }),
            Err(e @ GatewayError::Validation(_)) => {
                // Correctable: the model can revise its query
                json!({ "error": e.to_string() })
            }
            Err(e) => json!({ "error": e.to_string() }),
        }
    }
}

/// The single declared capability schema.
fn tool_declaration() -> ToolDeclaration {
    ToolDeclaration {
        name: TOOL_NAME.to_string(),
        description: "Execute a Cypher query against the code knowledge graph and return the rows"
            .to_string(),
        parameters: json!({
            "type": "OBJECT",
            "properties": {
                "query": { "type": "STRING", "description": "Cypher query" },
            },
            "required": ["query"],
        }),
    }
}
