//! Twitter posting skill.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use agentry_core::skill::{Skill, SkillContext};
use agentry_types::skill::{SkillCategory, SkillError, ToolSpec};

use super::skill_http_error;

const TWITTER_API_BASE: &str = "https://api.twitter.com/2";
const MAX_TWEET_CHARS: usize = 280;

#[derive(Deserialize)]
struct PostTweetArgs {
    text: String,
}

/// Posts a tweet on behalf of the agent using its configured bearer token.
///
/// Does NOT derive Debug, so the token can never leak through debug
/// formatting.
pub struct PostTweetSkill {
    http: reqwest::Client,
    bearer: SecretString,
}

impl PostTweetSkill {
    pub fn new(http: reqwest::Client, bearer: SecretString) -> Self {
        Self { http, bearer }
    }
}

impl Skill for PostTweetSkill {
    fn name(&self) -> &str {
        "post_tweet"
    }

    fn category(&self) -> SkillCategory {
        SkillCategory::Twitter
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "post_tweet".into(),
            description: "Publish a tweet from the agent's Twitter account. \
                          The text must be 280 characters or fewer."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Tweet text, at most 280 characters"
                    }
                },
                "required": ["text"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(
        &self,
        _ctx: &SkillContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, SkillError> {
        let args: PostTweetArgs = serde_json::from_value(args)
            .map_err(|e| SkillError::InvalidArguments(e.to_string()))?;
        let text = args.text.trim();
        if text.is_empty() {
            return Err(SkillError::InvalidArguments("tweet text must not be empty".into()));
        }
        if text.chars().count() > MAX_TWEET_CHARS {
            return Err(SkillError::InvalidArguments(format!(
                "tweet text exceeds {MAX_TWEET_CHARS} characters"
            )));
        }

        let response = self
            .http
            .post(format!("{TWITTER_API_BASE}/tweets"))
            .bearer_auth(self.bearer.expose_secret())
            .json(&json!({"text": text}))
            .send()
            .await
            .map_err(skill_http_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SkillError::Credential(format!("twitter rejected token ({status})")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SkillError::Execution(format!("twitter returned {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SkillError::Execution(format!("invalid twitter response: {e}")))?;
        let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

        Ok(json!({"id": id, "text": text}))
    }
}
