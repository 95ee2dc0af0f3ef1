//! OpenAI-compatible LLM provider implementation.
//!
//! One provider serves any endpoint speaking the chat-completions dialect
//! (OpenAI, Gemini's compatibility endpoint, Mistral, local proxies) via a
//! configurable base URL. Non-streaming, with tool calling.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use agentry_core::llm::LlmProvider;
use agentry_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, LlmMessage, LlmRole, TokenUsage, ToolCall,
};
use agentry_types::skill::ToolSpec;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Unified provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug, so the API key can never leak through debug
/// formatting.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    provider_name: String,
    timeout_secs: u64,
}

impl OpenAiCompatProvider {
    pub fn new(
        provider_name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            provider_name: provider_name.into(),
            timeout_secs,
        })
    }

    /// Provider against the official OpenAI endpoint.
    pub fn openai(api_key: SecretString) -> Result<Self, LlmError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            DEFAULT_TIMEOUT_SECS,
        )
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// The dialect carries arguments as a JSON-encoded string.
    arguments: String,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn wire_message(message: &LlmMessage) -> WireMessage {
    let role = match message.role {
        LlmRole::System => "system",
        LlmRole::User => "user",
        LlmRole::Assistant => "assistant",
        LlmRole::Tool => "tool",
    };
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".into(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };
    WireMessage {
        role,
        // Assistant tool-call turns have no text content.
        content: (!message.content.is_empty() || tool_calls.is_none())
            .then(|| message.content.clone()),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn parse_tool_call(wire: WireToolCall) -> ToolCall {
    // Malformed argument JSON is passed through as a raw string so the
    // skill's own validation rejects it recoverably.
    let arguments = serde_json::from_str(&wire.function.arguments)
        .unwrap_or(serde_json::Value::String(wire.function.arguments));
    ToolCall {
        id: wire.id,
        name: wire.function.name,
        arguments,
    }
}

impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = WireRequest {
            model: &request.model,
            messages: request.messages.iter().map(wire_message).collect(),
            temperature: request.temperature,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            tools: request
                .tools
                .iter()
                .map(|spec| WireTool {
                    kind: "function",
                    function: spec,
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".into()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(parse_tool_call)
                .collect(),
            usage: wire
                .usage
                .map(|u| TokenUsage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                })
                .unwrap_or_default(),
        })
    }
}
