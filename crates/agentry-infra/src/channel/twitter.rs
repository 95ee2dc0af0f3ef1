//! Twitter mention-polling channel.
//!
//! Polls the v2 mentions timeline of the account behind the agent's bearer
//! token and replies in the mention's conversation thread.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use agentry_core::channel::{ChannelAdapter, ChannelClient, ChannelError, InboundMessage};
use agentry_types::agent::Agent;
use agentry_types::chat::Entrypoint;

use super::{channel_client, channel_http_error};

const TWITTER_API_BASE: &str = "https://api.twitter.com/2";
const MAX_MENTIONS_PER_POLL: u32 = 25;

/// Builds mention-polling clients for agents with the Twitter entrypoint
/// enabled.
pub struct TwitterAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl TwitterAdapter {
    pub fn new() -> Result<Self, ChannelError> {
        Ok(Self {
            http: channel_client()?,
            base_url: TWITTER_API_BASE.to_string(),
        })
    }
}

impl ChannelAdapter for TwitterAdapter {
    type Client = TwitterClient;

    fn entrypoint(&self) -> Entrypoint {
        Entrypoint::Twitter
    }

    fn client_for(&self, agent: &Agent) -> Option<Self::Client> {
        let twitter = agent.config.skills.twitter.as_ref()?;
        if !twitter.enabled || !twitter.entrypoint_enabled {
            return None;
        }
        let bearer = twitter.bearer_token.as_deref()?;
        Some(TwitterClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            bearer: SecretString::from(bearer),
        })
    }
}

/// Mention poller for one agent's Twitter account.
///
/// Does NOT derive Debug, so the token can never leak through debug
/// formatting.
pub struct TwitterClient {
    http: reqwest::Client,
    base_url: String,
    bearer: SecretString,
}

#[derive(Deserialize)]
struct UserResponse {
    data: UserData,
}

#[derive(Deserialize)]
struct UserData {
    id: String,
}

#[derive(Deserialize)]
struct MentionsResponse {
    #[serde(default)]
    data: Vec<Mention>,
}

#[derive(Deserialize)]
struct Mention {
    id: String,
    text: String,
    author_id: String,
    #[serde(default)]
    conversation_id: Option<String>,
}

impl TwitterClient {
    fn check_auth(&self, status: reqwest::StatusCode) -> Result<(), ChannelError> {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ChannelError::Credential(format!("twitter rejected token ({status})")));
        }
        Ok(())
    }

    /// The authenticated account's user id, needed for the mentions route.
    async fn own_user_id(&self) -> Result<String, ChannelError> {
        let response = self
            .http
            .get(format!("{}/users/me", self.base_url))
            .bearer_auth(self.bearer.expose_secret())
            .send()
            .await
            .map_err(channel_http_error)?;
        self.check_auth(response.status())?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Transport(format!("users/me returned {status}")));
        }
        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(format!("invalid users/me response: {e}")))?;
        Ok(user.data.id)
    }
}

impl ChannelClient for TwitterClient {
    async fn poll(&self, cursor: Option<&str>) -> Result<Vec<InboundMessage>, ChannelError> {
        let user_id = self.own_user_id().await?;

        let mut query: Vec<(&str, String)> = vec![
            ("tweet.fields", "author_id,conversation_id".into()),
            ("max_results", MAX_MENTIONS_PER_POLL.to_string()),
        ];
        if let Some(since_id) = cursor {
            query.push(("since_id", since_id.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/users/{user_id}/mentions", self.base_url))
            .bearer_auth(self.bearer.expose_secret())
            .query(&query)
            .send()
            .await
            .map_err(channel_http_error)?;
        self.check_auth(response.status())?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Transport(format!("mentions returned {status}")));
        }

        let mentions: MentionsResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(format!("invalid mentions response: {e}")))?;

        // The timeline arrives newest first; the sweep wants oldest first.
        let mut inbound: Vec<InboundMessage> = mentions
            .data
            .into_iter()
            .map(|m| InboundMessage {
                chat_id: m.conversation_id.unwrap_or_else(|| m.id.clone()),
                id: m.id,
                author_id: m.author_id,
                text: m.text,
            })
            .collect();
        inbound.reverse();
        Ok(inbound)
    }

    async fn reply(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let response = self
            .http
            .post(format!("{}/tweets", self.base_url))
            .bearer_auth(self.bearer.expose_secret())
            .json(&json!({
                "text": text,
                "reply": {"in_reply_to_tweet_id": chat_id},
            }))
            .send()
            .await
            .map_err(channel_http_error)?;
        self.check_auth(response.status())?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Transport(format!("tweet reply returned {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_types::agent::{AgentConfig, AgentId, SkillsConfig, TwitterSkillsConfig};
    use chrono::Utc;

    fn agent_with(twitter: Option<TwitterSkillsConfig>) -> Agent {
        Agent {
            id: AgentId::new("tw-agent").unwrap(),
            name: "Tw Agent".into(),
            owner: None,
            config: AgentConfig {
                skills: SkillsConfig {
                    twitter,
                    ..Default::default()
                },
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_client_for_requires_entrypoint_and_token() {
        let adapter = TwitterAdapter::new().unwrap();

        assert!(adapter.client_for(&agent_with(None)).is_none());
        assert!(
            adapter
                .client_for(&agent_with(Some(TwitterSkillsConfig {
                    entrypoint_enabled: false,
                    bearer_token: Some("t".into()),
                    ..Default::default()
                })))
                .is_none()
        );
        assert!(
            adapter
                .client_for(&agent_with(Some(TwitterSkillsConfig {
                    entrypoint_enabled: true,
                    bearer_token: None,
                    ..Default::default()
                })))
                .is_none()
        );
        assert!(
            adapter
                .client_for(&agent_with(Some(TwitterSkillsConfig {
                    entrypoint_enabled: true,
                    bearer_token: Some("t".into()),
                    ..Default::default()
                })))
                .is_some()
        );
    }

    #[test]
    fn test_disabled_category_disables_entrypoint() {
        let adapter = TwitterAdapter::new().unwrap();
        let agent = agent_with(Some(TwitterSkillsConfig {
            enabled: false,
            entrypoint_enabled: true,
            bearer_token: Some("t".into()),
            ..Default::default()
        }));
        assert!(adapter.client_for(&agent).is_none());
    }

    #[test]
    fn test_mentions_parse_and_reverse_to_oldest_first() {
        let mentions: MentionsResponse = serde_json::from_value(serde_json::json!({
            "data": [
                {"id": "3", "text": "newest", "author_id": "u1", "conversation_id": "c1"},
                {"id": "2", "text": "older", "author_id": "u2"},
            ]
        }))
        .unwrap();

        let mut inbound: Vec<InboundMessage> = mentions
            .data
            .into_iter()
            .map(|m| InboundMessage {
                chat_id: m.conversation_id.unwrap_or_else(|| m.id.clone()),
                id: m.id,
                author_id: m.author_id,
                text: m.text,
            })
            .collect();
        inbound.reverse();

        assert_eq!(inbound[0].id, "2");
        // A mention with no conversation id threads on its own tweet id.
        assert_eq!(inbound[0].chat_id, "2");
        assert_eq!(inbound[1].chat_id, "c1");
    }
}
