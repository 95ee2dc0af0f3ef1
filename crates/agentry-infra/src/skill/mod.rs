//! Default skill factory: core built-ins plus HTTP-backed skills.

mod market;
mod twitter;
mod web;

pub use market::TokenPriceSkill;
pub use twitter::PostTweetSkill;
pub use web::FetchUrlSkill;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use agentry_core::skill::common::CurrentTimeSkill;
use agentry_core::skill::{BoxSkill, SkillFactory, SkillInstance};
use agentry_types::agent::Agent;
use agentry_types::error::ConfigError;
use agentry_types::skill::{SkillCategory, SkillError};

/// Timeout applied to every outbound skill HTTP call.
pub(crate) const SKILL_TIMEOUT_SECS: u64 = 30;

pub(crate) fn skill_http_error(e: reqwest::Error) -> SkillError {
    if e.is_timeout() {
        SkillError::Timeout(SKILL_TIMEOUT_SECS)
    } else {
        SkillError::Execution(e.to_string())
    }
}

/// The factory wired into the registry in production.
///
/// Stateless skills share one HTTP client; credentialed skills are built per
/// agent from the credentials in its skills configuration.
pub struct DefaultSkillFactory {
    http: reqwest::Client,
}

impl DefaultSkillFactory {
    pub fn new() -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SKILL_TIMEOUT_SECS))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))?;
        Ok(Self { http })
    }
}

impl SkillFactory for DefaultSkillFactory {
    fn known_skills(&self, category: SkillCategory) -> &'static [&'static str] {
        match category {
            SkillCategory::Common => &["current_time"],
            SkillCategory::Web => &["fetch_url"],
            SkillCategory::Market => &["token_price"],
            SkillCategory::Twitter => &["post_tweet"],
            SkillCategory::Telegram => &[],
        }
    }

    fn build(
        &self,
        agent: &Agent,
        category: SkillCategory,
        name: &str,
    ) -> Result<SkillInstance, ConfigError> {
        match (category, name) {
            (SkillCategory::Common, "current_time") => Ok(SkillInstance::Stateless(Arc::new(
                BoxSkill::new(CurrentTimeSkill),
            ))),
            (SkillCategory::Web, "fetch_url") => Ok(SkillInstance::Stateless(Arc::new(
                BoxSkill::new(FetchUrlSkill::new(self.http.clone())),
            ))),
            (SkillCategory::Market, "token_price") => {
                let api_key = agent
                    .config
                    .skills
                    .market
                    .as_ref()
                    .and_then(|m| m.api_key.as_deref())
                    .map(SecretString::from);
                Ok(SkillInstance::PerAgent(Arc::new(BoxSkill::new(
                    TokenPriceSkill::new(self.http.clone(), api_key),
                ))))
            }
            (SkillCategory::Twitter, "post_tweet") => {
                let bearer = agent
                    .config
                    .skills
                    .twitter
                    .as_ref()
                    .and_then(|t| t.bearer_token.as_deref())
                    .ok_or(ConfigError::MissingCredential {
                        category: "twitter".into(),
                        field: "bearer_token",
                    })?;
                Ok(SkillInstance::PerAgent(Arc::new(BoxSkill::new(
                    PostTweetSkill::new(self.http.clone(), SecretString::from(bearer)),
                ))))
            }
            _ => Err(ConfigError::UnknownSkill {
                category: category.to_string(),
                skill: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use agentry_core::skill::{BoxSkillStore, SkillContext, SkillStore};
    use agentry_types::agent::AgentId;
    use agentry_types::chat::Entrypoint;
    use agentry_types::error::RepositoryError;
    use agentry_types::store::{SkillStoreEntry, SkillStoreScope};
    use std::sync::Arc;

    pub struct NullStore;

    impl SkillStore for NullStore {
        async fn get(
            &self,
            _agent_id: &AgentId,
            _scope: &SkillStoreScope,
            _skill: &str,
            _key: &str,
        ) -> Result<Option<serde_json::Value>, RepositoryError> {
            Ok(None)
        }

        async fn set(
            &self,
            _agent_id: &AgentId,
            _scope: &SkillStoreScope,
            _skill: &str,
            _key: &str,
            _value: &serde_json::Value,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn delete(
            &self,
            _agent_id: &AgentId,
            _scope: &SkillStoreScope,
            _skill: &str,
            _key: &str,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn list(
            &self,
            _agent_id: &AgentId,
            _scope: &SkillStoreScope,
            _skill: &str,
        ) -> Result<Vec<SkillStoreEntry>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    pub fn null_ctx(agent: &str) -> SkillContext {
        SkillContext {
            agent_id: AgentId::new(agent).unwrap(),
            chat_id: "test-chat".into(),
            user_id: None,
            entrypoint: Entrypoint::Api,
            store: Arc::new(BoxSkillStore::new(NullStore)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_types::agent::{AgentConfig, AgentId, MarketSkillsConfig, TwitterSkillsConfig};
    use agentry_types::agent::SkillsConfig;
    use chrono::Utc;

    fn agent_with(skills: SkillsConfig) -> Agent {
        Agent {
            id: AgentId::new("factory-test").unwrap(),
            name: "Factory Test".into(),
            owner: None,
            config: AgentConfig {
                skills,
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stateless_skills_build_without_config() {
        let factory = DefaultSkillFactory::new().unwrap();
        let agent = agent_with(SkillsConfig::default());

        let time = factory
            .build(&agent, SkillCategory::Common, "current_time")
            .unwrap();
        assert!(matches!(time, SkillInstance::Stateless(_)));

        let fetch = factory.build(&agent, SkillCategory::Web, "fetch_url").unwrap();
        assert!(matches!(fetch, SkillInstance::Stateless(_)));
    }

    #[test]
    fn test_token_price_builds_with_or_without_key() {
        let factory = DefaultSkillFactory::new().unwrap();

        let without = agent_with(SkillsConfig::default());
        assert!(matches!(
            factory.build(&without, SkillCategory::Market, "token_price"),
            Ok(SkillInstance::PerAgent(_))
        ));

        let with = agent_with(SkillsConfig {
            market: Some(MarketSkillsConfig {
                api_key: Some("cg-key".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(matches!(
            factory.build(&with, SkillCategory::Market, "token_price"),
            Ok(SkillInstance::PerAgent(_))
        ));
    }

    #[test]
    fn test_post_tweet_requires_bearer_token() {
        let factory = DefaultSkillFactory::new().unwrap();

        let missing = agent_with(SkillsConfig::default());
        let err = factory
            .build(&missing, SkillCategory::Twitter, "post_tweet")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { field: "bearer_token", .. }));

        let with = agent_with(SkillsConfig {
            twitter: Some(TwitterSkillsConfig {
                bearer_token: Some("token".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(matches!(
            factory.build(&with, SkillCategory::Twitter, "post_tweet"),
            Ok(SkillInstance::PerAgent(_))
        ));
    }

    #[test]
    fn test_unknown_name_rejected() {
        let factory = DefaultSkillFactory::new().unwrap();
        let agent = agent_with(SkillsConfig::default());
        let err = factory
            .build(&agent, SkillCategory::Web, "time_travel")
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSkill { .. }));
    }
}
