//! Per-agent autonomous run scheduling.
//!
//! One tokio task per autonomously-enabled agent, ticking at the agent's
//! configured interval. The scheduler rescans the agent table periodically
//! so enabling, disabling, or retuning an agent takes effect without a
//! restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use agentry_types::agent::{Agent, AgentId};
use agentry_types::chat::Entrypoint;
use agentry_types::error::ChatError;

use crate::chat::{ChatRequest, ChatService};
use crate::memory::MemoryRepository;
use crate::quota::QuotaRepository;
use crate::repository::AgentRepository;
use crate::skill::SkillFactory;

/// Chat id all autonomous runs of an agent share.
const AUTONOMOUS_CHAT_ID: &str = "autonomous";

/// What an agent's autonomous task runs. Tasks are replaced when this
/// changes between rescans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub minutes: u32,
    pub prompt: String,
}

impl TaskSpec {
    /// The spec for an agent, or None when autonomous mode is off or has no
    /// prompt to run.
    pub fn from_agent(agent: &Agent) -> Option<Self> {
        let auto = &agent.config.autonomous;
        if !auto.enabled {
            return None;
        }
        let prompt = auto.prompt.clone()?;
        Some(Self {
            minutes: auto.minutes.max(1),
            prompt,
        })
    }
}

struct AgentTask {
    spec: TaskSpec,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives autonomous runs for every enabled agent.
pub struct AutonomousScheduler<A, Q, M, F>
where
    A: AgentRepository + 'static,
    Q: QuotaRepository + 'static,
    M: MemoryRepository + 'static,
    F: SkillFactory + 'static,
{
    agents: A,
    chat: Arc<ChatService<A, Q, M, F>>,
    rescan: Duration,
}

impl<A, Q, M, F> AutonomousScheduler<A, Q, M, F>
where
    A: AgentRepository + 'static,
    Q: QuotaRepository + 'static,
    M: MemoryRepository + 'static,
    F: SkillFactory + 'static,
{
    pub fn new(agents: A, chat: Arc<ChatService<A, Q, M, F>>, rescan: Duration) -> Self {
        Self {
            agents,
            chat,
            rescan,
        }
    }

    /// Run until cancelled, rescanning the agent table every `rescan`.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(rescan_secs = self.rescan.as_secs(), "autonomous scheduler started");
        let mut tasks: HashMap<AgentId, AgentTask> = HashMap::new();
        loop {
            match self.agents.list().await {
                Ok(agents) => self.reconcile(&mut tasks, &agents),
                Err(err) => warn!(error = %err, "agent rescan failed"),
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.rescan) => {}
            }
        }
        for (agent_id, task) in tasks.drain() {
            task.cancel.cancel();
            task.handle.abort();
            info!(%agent_id, "autonomous task stopped");
        }
        info!("autonomous scheduler stopped");
    }

    /// Align running tasks with the stored agents: spawn new, replace
    /// changed, cancel removed.
    fn reconcile(&self, tasks: &mut HashMap<AgentId, AgentTask>, agents: &[Agent]) {
        let mut desired: HashMap<AgentId, TaskSpec> = HashMap::new();
        for agent in agents {
            if let Some(spec) = TaskSpec::from_agent(agent) {
                desired.insert(agent.id.clone(), spec);
            }
        }

        tasks.retain(|agent_id, task| {
            let keep = desired.get(agent_id) == Some(&task.spec);
            if !keep {
                task.cancel.cancel();
                info!(%agent_id, "autonomous task cancelled");
            }
            keep
        });

        for (agent_id, spec) in desired {
            if tasks.contains_key(&agent_id) {
                continue;
            }
            info!(%agent_id, minutes = spec.minutes, "autonomous task started");
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(Self::agent_loop(
                self.chat.clone(),
                agent_id.clone(),
                spec.clone(),
                cancel.clone(),
            ));
            tasks.insert(
                agent_id,
                AgentTask {
                    spec,
                    cancel,
                    handle,
                },
            );
        }
    }

    async fn agent_loop(
        chat: Arc<ChatService<A, Q, M, F>>,
        agent_id: AgentId,
        spec: TaskSpec,
        cancel: CancellationToken,
    ) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(u64::from(spec.minutes) * 60));
        // A missed tick (slow run, suspended host) runs once, late, rather
        // than bursting to catch up.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; consume it
        // so the first run happens one full interval after startup.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = interval.tick() => {}
            }
            let outcome = chat
                .handle(ChatRequest {
                    agent_id: agent_id.clone(),
                    chat_id: AUTONOMOUS_CHAT_ID.to_string(),
                    user_id: None,
                    message: spec.prompt.clone(),
                    origin: Entrypoint::Autonomous,
                })
                .await;
            match outcome {
                Ok(reply) => {
                    info!(%agent_id, chars = reply.content.len(), "autonomous run completed");
                }
                Err(ChatError::Quota(err)) => {
                    info!(%agent_id, error = %err, "autonomous run skipped");
                }
                Err(err) => {
                    warn!(%agent_id, error = %err, "autonomous run failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRuntime;
    use crate::llm::{BoxLlmProvider, LlmProvider};
    use crate::skill::testutil::NullStore;
    use crate::skill::{BoxSkillStore, SkillInstance};
    use crate::testsupport::{InMemoryAgents, InMemoryMemory, InMemoryQuotas};
    use agentry_types::agent::{AgentConfig, AutonomousConfig};
    use agentry_types::error::ConfigError;
    use agentry_types::llm::{CompletionRequest, CompletionResponse, LlmError, TokenUsage};
    use agentry_types::skill::SkillCategory;
    use chrono::Utc;

    struct TickProvider;

    impl LlmProvider for TickProvider {
        fn name(&self) -> &str {
            "tick"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: Some("tick done".into()),
                tool_calls: Vec::new(),
                usage: TokenUsage::default(),
            })
        }
    }

    struct NoSkills;

    impl SkillFactory for NoSkills {
        fn known_skills(&self, _category: SkillCategory) -> &'static [&'static str] {
            &[]
        }

        fn build(
            &self,
            _agent: &Agent,
            _category: SkillCategory,
            _name: &str,
        ) -> Result<SkillInstance, ConfigError> {
            Err(ConfigError::Invalid("no skills".into()))
        }
    }

    fn autonomous_agent(id: &str, minutes: u32) -> Agent {
        Agent {
            id: AgentId::new(id).unwrap(),
            name: "Auto".into(),
            owner: None,
            config: AgentConfig {
                autonomous: AutonomousConfig {
                    enabled: true,
                    minutes,
                    prompt: Some("report status".into()),
                },
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_task_spec_requires_enabled_and_prompt() {
        let mut agent = autonomous_agent("auto-spec", 5);
        assert_eq!(
            TaskSpec::from_agent(&agent),
            Some(TaskSpec {
                minutes: 5,
                prompt: "report status".into()
            })
        );

        agent.config.autonomous.enabled = false;
        assert_eq!(TaskSpec::from_agent(&agent), None);

        agent.config.autonomous.enabled = true;
        agent.config.autonomous.prompt = None;
        assert_eq!(TaskSpec::from_agent(&agent), None);
    }

    #[test]
    fn test_task_spec_clamps_zero_interval() {
        let mut agent = autonomous_agent("auto-zero", 5);
        agent.config.autonomous.minutes = 0;
        assert_eq!(TaskSpec::from_agent(&agent).unwrap().minutes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_runs_agent_on_interval() {
        let agents = Arc::new(InMemoryAgents::default());
        agents.put(autonomous_agent("auto-run", 1));
        let memory = Arc::new(InMemoryMemory::default());
        let chat = Arc::new(ChatService::new(
            agents.clone(),
            Arc::new(InMemoryQuotas::default()),
            memory.clone(),
            Arc::new(AgentRuntime::new(
                NoSkills,
                Arc::new(BoxLlmProvider::new(TickProvider)),
            )),
            Arc::new(BoxSkillStore::new(NullStore)),
        ));
        let scheduler =
            AutonomousScheduler::new(agents.clone(), chat, Duration::from_secs(1));

        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { scheduler.run(run_cancel).await });

        let agent_id = AgentId::new("auto-run").unwrap();
        // Paused time auto-advances; wait until at least two runs landed.
        loop {
            tokio::time::sleep(Duration::from_secs(30)).await;
            let transcript = memory.list(&agent_id, "autonomous").await.unwrap();
            if transcript.len() >= 4 {
                assert_eq!(transcript[0].content, "report status");
                assert_eq!(transcript[1].content, "tick done");
                assert_eq!(transcript[1].origin, Entrypoint::Autonomous);
                break;
            }
        }

        cancel.cancel();
        handle.await.unwrap();
    }
}
