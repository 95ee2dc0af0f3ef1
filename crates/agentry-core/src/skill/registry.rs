//! Skill registry: resolves an agent's configuration into a loaded tool set.
//!
//! The set of skills is closed at compile time; a `SkillFactory` (assembled
//! in agentry-infra) knows how to build each one. The registry validates
//! configurations against the factory's catalogue and caches stateless
//! skills so they are built once per process.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;

use agentry_types::agent::{Agent, SkillsConfig};
use agentry_types::error::ConfigError;
use agentry_types::skill::{CallerTrust, SkillCategory, SkillState};

use super::BoxSkill;

/// How a built skill may be shared.
pub enum SkillInstance {
    /// No per-agent state or credentials; cached by (category, name).
    Stateless(Arc<BoxSkill>),
    /// Carries agent credentials or configuration; built per agent.
    PerAgent(Arc<BoxSkill>),
}

impl std::fmt::Debug for SkillInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stateless(skill) => f.debug_tuple("Stateless").field(&skill.name()).finish(),
            Self::PerAgent(skill) => f.debug_tuple("PerAgent").field(&skill.name()).finish(),
        }
    }
}

/// Builds concrete skills from an agent's configuration.
pub trait SkillFactory: Send + Sync {
    /// The skill names this factory can build for `category`.
    fn known_skills(&self, category: SkillCategory) -> &'static [&'static str];

    /// Build one skill. Called only with names from `known_skills`; fails
    /// when the agent's category config lacks a required credential.
    fn build(
        &self,
        agent: &Agent,
        category: SkillCategory,
        name: &str,
    ) -> Result<SkillInstance, ConfigError>;
}

/// Per-process skill registry.
pub struct SkillRegistry<F: SkillFactory> {
    factory: F,
    stateless: DashMap<(SkillCategory, String), Arc<BoxSkill>>,
}

/// The category configs present on an agent, with their enabled flag and
/// per-skill states.
fn categories(
    skills: &SkillsConfig,
) -> Vec<(SkillCategory, bool, &BTreeMap<String, SkillState>)> {
    let mut out = Vec::new();
    if let Some(c) = &skills.common {
        out.push((SkillCategory::Common, c.enabled, &c.states));
    }
    if let Some(c) = &skills.web {
        out.push((SkillCategory::Web, c.enabled, &c.states));
    }
    if let Some(c) = &skills.market {
        out.push((SkillCategory::Market, c.enabled, &c.states));
    }
    if let Some(c) = &skills.twitter {
        out.push((SkillCategory::Twitter, c.enabled, &c.states));
    }
    if let Some(c) = &skills.telegram {
        out.push((SkillCategory::Telegram, c.enabled, &c.states));
    }
    out
}

impl<F: SkillFactory> SkillRegistry<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            stateless: DashMap::new(),
        }
    }

    /// Validate a skills configuration without building anything.
    ///
    /// Rejects skill names the factory does not know and entrypoints enabled
    /// without their credential. Runs at agent create/update time so bad
    /// configs never reach the reasoning loop.
    pub fn validate(&self, skills: &SkillsConfig) -> Result<(), ConfigError> {
        for (category, _, states) in categories(skills) {
            let known = self.factory.known_skills(category);
            for name in states.keys() {
                if !known.contains(&name.as_str()) {
                    return Err(ConfigError::UnknownSkill {
                        category: category.to_string(),
                        skill: name.clone(),
                    });
                }
            }
        }

        if let Some(twitter) = &skills.twitter
            && twitter.entrypoint_enabled
            && twitter.bearer_token.is_none()
        {
            return Err(ConfigError::MissingCredential {
                category: "twitter".into(),
                field: "bearer_token",
            });
        }
        if let Some(telegram) = &skills.telegram
            && telegram.entrypoint_enabled
            && telegram.bot_token.is_none()
        {
            return Err(ConfigError::MissingCredential {
                category: "telegram".into(),
                field: "bot_token",
            });
        }

        Ok(())
    }

    /// Resolve the tool set loaded for `agent` at the given trust level.
    ///
    /// Disabled categories contribute nothing; within an enabled category
    /// each skill's state decides per [`SkillState::allows`].
    pub fn tools_for(
        &self,
        agent: &Agent,
        trust: CallerTrust,
    ) -> Result<Vec<Arc<BoxSkill>>, ConfigError> {
        let mut tools = Vec::new();
        for (category, enabled, states) in categories(&agent.config.skills) {
            if !enabled {
                continue;
            }
            for (name, state) in states {
                if !state.allows(trust) {
                    continue;
                }
                tools.push(self.resolve(agent, category, name)?);
            }
        }
        Ok(tools)
    }

    fn resolve(
        &self,
        agent: &Agent,
        category: SkillCategory,
        name: &str,
    ) -> Result<Arc<BoxSkill>, ConfigError> {
        if let Some(cached) = self.stateless.get(&(category, name.to_string())) {
            return Ok(cached.clone());
        }
        match self.factory.build(agent, category, name)? {
            SkillInstance::Stateless(skill) => {
                self.stateless
                    .insert((category, name.to_string()), skill.clone());
                Ok(skill)
            }
            SkillInstance::PerAgent(skill) => Ok(skill),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{Skill, SkillContext};
    use agentry_types::agent::{AgentConfig, AgentId, CommonSkillsConfig, TwitterSkillsConfig};
    use agentry_types::skill::{SkillError, ToolSpec};
    use chrono::Utc;

    struct EchoSkill {
        name: &'static str,
        category: SkillCategory,
    }

    impl Skill for EchoSkill {
        fn name(&self) -> &str {
            self.name
        }

        fn category(&self) -> SkillCategory {
            self.category
        }

        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: self.name.into(),
                description: "echo".into(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            }
        }

        async fn call(
            &self,
            _ctx: &SkillContext,
            args: serde_json::Value,
        ) -> Result<serde_json::Value, SkillError> {
            Ok(args)
        }
    }

    struct TestFactory;

    impl SkillFactory for TestFactory {
        fn known_skills(&self, category: SkillCategory) -> &'static [&'static str] {
            match category {
                SkillCategory::Common => &["current_time"],
                SkillCategory::Twitter => &["post_tweet"],
                _ => &[],
            }
        }

        fn build(
            &self,
            _agent: &Agent,
            category: SkillCategory,
            name: &str,
        ) -> Result<SkillInstance, ConfigError> {
            let skill = Arc::new(BoxSkill::new(EchoSkill {
                name: match name {
                    "current_time" => "current_time",
                    _ => "post_tweet",
                },
                category,
            }));
            Ok(match category {
                SkillCategory::Common => SkillInstance::Stateless(skill),
                _ => SkillInstance::PerAgent(skill),
            })
        }
    }

    fn agent_with(skills: SkillsConfig) -> Agent {
        Agent {
            id: AgentId::new("reg-test").unwrap(),
            name: "Reg Test".into(),
            owner: None,
            config: AgentConfig {
                skills,
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn common_states(pairs: &[(&str, SkillState)]) -> SkillsConfig {
        SkillsConfig {
            common: Some(CommonSkillsConfig {
                enabled: true,
                states: pairs
                    .iter()
                    .map(|(n, s)| (n.to_string(), *s))
                    .collect(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_rejects_unknown_skill() {
        let registry = SkillRegistry::new(TestFactory);
        let skills = common_states(&[("time_travel", SkillState::Public)]);
        let err = registry.validate(&skills).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSkill { .. }));
    }

    #[test]
    fn test_validate_requires_entrypoint_credential() {
        let registry = SkillRegistry::new(TestFactory);
        let skills = SkillsConfig {
            twitter: Some(TwitterSkillsConfig {
                entrypoint_enabled: true,
                bearer_token: None,
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = registry.validate(&skills).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[test]
    fn test_private_skill_loaded_for_internal_only() {
        let registry = SkillRegistry::new(TestFactory);
        let agent = agent_with(common_states(&[("current_time", SkillState::Private)]));

        let public = registry.tools_for(&agent, CallerTrust::Public).unwrap();
        assert!(public.is_empty());

        let internal = registry.tools_for(&agent, CallerTrust::Internal).unwrap();
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].name(), "current_time");
    }

    #[test]
    fn test_disabled_category_loads_nothing() {
        let registry = SkillRegistry::new(TestFactory);
        let mut skills = common_states(&[("current_time", SkillState::Public)]);
        skills.common.as_mut().unwrap().enabled = false;
        let agent = agent_with(skills);
        assert!(registry.tools_for(&agent, CallerTrust::Internal).unwrap().is_empty());
    }

    #[test]
    fn test_stateless_skill_cached_across_agents() {
        let registry = SkillRegistry::new(TestFactory);
        let a = agent_with(common_states(&[("current_time", SkillState::Public)]));
        let first = registry.tools_for(&a, CallerTrust::Public).unwrap();
        let second = registry.tools_for(&a, CallerTrust::Public).unwrap();
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }
}
