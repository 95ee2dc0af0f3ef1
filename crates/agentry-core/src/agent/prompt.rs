//! System prompt composition.

use agentry_types::agent::Agent;

/// Fixed preamble prepended to every agent's system prompt.
const PREAMBLE: &str = "\
You are an AI agent built on the Agentry platform.\n\
Your tools are called skills. Use a skill whenever it would answer the \
user better than your own knowledge.\n\
If a skill fails with a technical error, apologize and suggest trying \
again later; never invent a result.\n";

/// Compose the full system prompt for an agent.
///
/// Order is fixed: platform preamble, agent name, the configured base
/// prompt, then `prompt_append`. Sections the config omits are skipped
/// without leaving blank gaps.
pub fn compose_system_prompt(agent: &Agent) -> String {
    let mut sections = vec![PREAMBLE.to_string(), format!("Your name is {}.", agent.name)];
    if let Some(prompt) = &agent.config.prompt {
        sections.push(prompt.clone());
    }
    if let Some(append) = &agent.config.prompt_append {
        sections.push(append.clone());
    }
    sections.join("\n\n")
}
