//! The reasoning loop: completions, tool dispatch, bounded steps.

use std::sync::Arc;

use tracing::{debug, warn};

use agentry_types::agent::{Agent, AgentId};
use agentry_types::chat::{ChatMessage, MessageRole};
use agentry_types::error::ChatError;
use agentry_types::llm::{CompletionRequest, CompletionResponse, LlmError, LlmMessage, ToolCall};
use agentry_types::skill::SkillError;

use crate::llm::BoxLlmProvider;
use crate::skill::{BoxSkill, SkillContext};

/// Upper bound on completion/tool-dispatch rounds per request.
const MAX_STEPS: usize = 8;

/// Retries for recoverable provider errors within one step.
const LLM_RETRIES: u32 = 2;

/// An immutable, cache-friendly executor for one agent at one trust level.
///
/// Holds everything derived from the agent's configuration: the composed
/// system prompt, model parameters, and the resolved tool set. Rebuilt by
/// [`super::AgentRuntime`] whenever the configuration fingerprint changes.
pub struct AgentExecutor {
    agent_id: AgentId,
    model: String,
    temperature: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    system_prompt: String,
    tools: Vec<Arc<BoxSkill>>,
    provider: Arc<BoxLlmProvider>,
}

impl AgentExecutor {
    pub fn new(agent: &Agent, tools: Vec<Arc<BoxSkill>>, provider: Arc<BoxLlmProvider>) -> Self {
        Self {
            agent_id: agent.id.clone(),
            model: agent.config.model.clone(),
            temperature: agent.config.temperature,
            frequency_penalty: agent.config.frequency_penalty,
            presence_penalty: agent.config.presence_penalty,
            system_prompt: super::compose_system_prompt(agent),
            tools,
            provider,
        }
    }

    /// Names of the loaded tools, for logs and introspection.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Run one request to a final text answer.
    ///
    /// Recoverable skill failures are fed back to the model as observations;
    /// fatal errors abort the request. The loop is bounded by `MAX_STEPS`
    /// rounds so a looping model cannot spin forever.
    pub async fn run(
        &self,
        history: &[ChatMessage],
        input: &str,
        ctx: &SkillContext,
    ) -> Result<String, ChatError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(LlmMessage::system(&self.system_prompt));
        for turn in history {
            match turn.role {
                MessageRole::User => messages.push(LlmMessage::user(&turn.content)),
                MessageRole::Assistant => messages.push(LlmMessage::assistant(&turn.content)),
                MessageRole::System => messages.push(LlmMessage::system(&turn.content)),
            }
        }
        messages.push(LlmMessage::user(input));

        let tool_specs: Vec<_> = self.tools.iter().map(|t| t.spec()).collect();

        for step in 0..MAX_STEPS {
            let request = CompletionRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                frequency_penalty: self.frequency_penalty,
                presence_penalty: self.presence_penalty,
                tools: tool_specs.clone(),
            };
            let response = self.complete_with_retry(&request).await?;

            if !response.tool_calls.is_empty() {
                debug!(
                    agent_id = %self.agent_id,
                    step,
                    calls = response.tool_calls.len(),
                    "dispatching tool calls"
                );
                messages.push(LlmMessage::assistant_tool_calls(response.tool_calls.clone()));
                for call in &response.tool_calls {
                    let observation = self.observe(call, ctx).await?;
                    messages.push(LlmMessage::tool_result(call.id.clone(), observation));
                }
                continue;
            }

            return match response.content {
                Some(content) if !content.is_empty() => Ok(content),
                _ => Err(LlmError::InvalidResponse("empty completion".into()).into()),
            };
        }

        Err(LlmError::InvalidResponse(format!("no final answer after {MAX_STEPS} steps")).into())
    }

    /// Dispatch one tool call, turning recoverable failures into an
    /// observation string the model can react to.
    async fn observe(&self, call: &ToolCall, ctx: &SkillContext) -> Result<String, ChatError> {
        match self.dispatch(call, ctx).await {
            Ok(value) => Ok(value.to_string()),
            Err(err) if err.is_recoverable() => {
                warn!(agent_id = %self.agent_id, skill = %call.name, error = %err, "skill call failed, continuing");
                Ok(format!("error: {err}"))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn dispatch(
        &self,
        call: &ToolCall,
        ctx: &SkillContext,
    ) -> Result<serde_json::Value, SkillError> {
        let Some(skill) = self.tools.iter().find(|t| t.name() == call.name) else {
            // The model named a tool it was never offered; recoverable.
            return Err(SkillError::Execution(format!("unknown skill '{}'", call.name)));
        };
        skill.call(ctx, call.arguments.clone()).await
    }

    async fn complete_with_retry(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let mut attempt = 0;
        loop {
            match self.provider.complete(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_recoverable() && attempt < LLM_RETRIES => {
                    attempt += 1;
                    warn!(agent_id = %self.agent_id, attempt, error = %err, "retrying completion");
                }
                Err(err) => return Err(err),
            }
        }
    }
}
