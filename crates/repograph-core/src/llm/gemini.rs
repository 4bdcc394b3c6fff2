//! Gemini API client (generateContent with function calling).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{LlmError, Message, ModelTurn, ToolCall, ToolDeclaration, ToolModel};
use crate::config::{DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL, LlmConfig};

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    api_url: String,
    model: String,
    client: Client,
}

impl GeminiClient {
    /// Creates a client from the LLM configuration.
    ///
    /// A missing API key is a constructor-time error so a misconfigured
    /// process fails before any question is accepted.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or(LlmError::MissingApiKey)?;
        Ok(Self {
            api_key,
            api_url: DEFAULT_GEMINI_URL.to_string(),
            model: config.model.clone(),
            client: Client::new(),
        })
    }

    /// Creates a client with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_GEMINI_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            client: Client::new(),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API base URL (for proxies).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn send_request(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status == 429 {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl ToolModel for GeminiClient {
    async fn generate(
        &self,
        system: &str,
        tools: &[ToolDeclaration],
        history: &[Message],
    ) -> Result<ModelTurn, LlmError> {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(system)],
            },
            contents: history.iter().map(content_from_message).collect(),
            tools: vec![Tool {
                function_declarations: tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }],
        };

        let response = self.send_request(&request).await?;

        let mut turn = ModelTurn::default();
        let mut texts = Vec::new();

        for candidate in response.candidates {
            let Some(content) = candidate.content else {
                continue;
            };
            for part in content.parts {
                if let Some(text) = part.text {
                    texts.push(text);
                }
                if let Some(call) = part.function_call {
                    turn.tool_calls.push(ToolCall {
                        name: call.name,
                        args: call.args,
                    });
                }
            }
        }

        if !texts.is_empty() {
            turn.text = Some(texts.join(""));
        }

        Ok(turn)
    }
}

fn content_from_message(message: &Message) -> Content {
    match message {
        Message::User { text } => Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        },
        Message::Assistant { text, tool_calls } => {
            let mut parts = Vec::new();
            if let Some(text) = text {
                parts.push(Part::text(text));
            }
            for call in tool_calls {
                parts.push(Part {
                    function_call: Some(FunctionCall {
                        name: call.name.clone(),
                        args: call.args.clone(),
                    }),
                    ..Part::default()
                });
            }
            Content {
                role: Some("model".to_string()),
                parts,
            }
        }
        Message::ToolResult { name, content } => Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                function_response: Some(FunctionResponse {
                    name: name.clone(),
                    response: content.clone(),
                }),
                ..Part::default()
            }],
        },
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
