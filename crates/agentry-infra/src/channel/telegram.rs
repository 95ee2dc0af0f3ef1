//! Telegram long-poll channel over the Bot API.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use agentry_core::channel::{ChannelAdapter, ChannelClient, ChannelError, InboundMessage};
use agentry_types::agent::Agent;
use agentry_types::chat::Entrypoint;

use super::{channel_client, channel_http_error};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const MAX_UPDATES_PER_POLL: u32 = 25;

/// Builds getUpdates clients for agents with the Telegram entrypoint enabled.
pub struct TelegramAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramAdapter {
    pub fn new() -> Result<Self, ChannelError> {
        Ok(Self {
            http: channel_client()?,
            base_url: TELEGRAM_API_BASE.to_string(),
        })
    }
}

impl ChannelAdapter for TelegramAdapter {
    type Client = TelegramClient;

    fn entrypoint(&self) -> Entrypoint {
        Entrypoint::Telegram
    }

    fn client_for(&self, agent: &Agent) -> Option<Self::Client> {
        let telegram = agent.config.skills.telegram.as_ref()?;
        if !telegram.enabled || !telegram.entrypoint_enabled {
            return None;
        }
        let token = telegram.bot_token.as_deref()?;
        Some(TelegramClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: SecretString::from(token),
        })
    }
}

/// getUpdates poller for one agent's bot.
///
/// Does NOT derive Debug, so the token can never leak through debug
/// formatting.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

#[derive(Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    text: Option<String>,
    chat: Chat,
    #[serde(default)]
    from: Option<From>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Deserialize)]
struct From {
    id: i64,
}

impl TelegramClient {
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.base_url,
            self.token.expose_secret()
        )
    }

    fn check(&self, status: reqwest::StatusCode) -> Result<(), ChannelError> {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ChannelError::Credential("telegram rejected bot token".into()));
        }
        Ok(())
    }
}

impl ChannelClient for TelegramClient {
    async fn poll(&self, cursor: Option<&str>) -> Result<Vec<InboundMessage>, ChannelError> {
        // The cursor stores the last handled update id; getUpdates takes the
        // first id to return.
        let offset = cursor.and_then(|c| c.parse::<i64>().ok()).map(|id| id + 1);

        let mut query: Vec<(&str, String)> =
            vec![("limit", MAX_UPDATES_PER_POLL.to_string()), ("timeout", "0".into())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&query)
            .send()
            .await
            .map_err(channel_http_error)?;
        self.check(response.status())?;

        let updates: UpdatesResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(format!("invalid getUpdates response: {e}")))?;
        if !updates.ok {
            return Err(ChannelError::Transport(format!(
                "getUpdates failed: {}",
                updates.description.unwrap_or_default()
            )));
        }

        // Updates arrive oldest first already. Non-text updates are skipped;
        // the cursor passes them once a later text update is handled.
        Ok(updates
            .result
            .into_iter()
            .filter_map(|update| {
                let message = update.message?;
                let text = message.text?;
                Some(InboundMessage {
                    id: update.update_id.to_string(),
                    author_id: message
                        .from
                        .map(|f| f.id.to_string())
                        .unwrap_or_default(),
                    chat_id: message.chat.id.to_string(),
                    text,
                })
            })
            .collect())
    }

    async fn reply(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let chat_id: i64 = chat_id
            .parse()
            .map_err(|_| ChannelError::Transport(format!("invalid telegram chat id '{chat_id}'")))?;

        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&json!({"chat_id": chat_id, "text": text}))
            .send()
            .await
            .map_err(channel_http_error)?;
        self.check(response.status())?;

        let body: UpdatesResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(format!("invalid sendMessage response: {e}")))?;
        if !body.ok {
            return Err(ChannelError::Transport(format!(
                "sendMessage failed: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}
