//! Market-data skill backed by the CoinGecko simple-price API.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use agentry_core::skill::{Skill, SkillContext};
use agentry_types::skill::{SkillCategory, SkillError, ToolSpec};

use super::skill_http_error;

const PRICE_API_BASE: &str = "https://api.coingecko.com/api/v3";

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Deserialize)]
struct TokenPriceArgs {
    /// CoinGecko coin id, e.g. "bitcoin" or "ethereum".
    token: String,
    #[serde(default = "default_currency")]
    currency: String,
}

/// Looks up the current price of a token.
///
/// Works unauthenticated against the public tier; an agent-level API key
/// raises the rate limit when configured.
pub struct TokenPriceSkill {
    http: reqwest::Client,
    api_key: Option<SecretString>,
}

impl TokenPriceSkill {
    pub fn new(http: reqwest::Client, api_key: Option<SecretString>) -> Self {
        Self { http, api_key }
    }
}

impl Skill for TokenPriceSkill {
    fn name(&self) -> &str {
        "token_price"
    }

    fn category(&self) -> SkillCategory {
        SkillCategory::Market
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "token_price".into(),
            description: "Get the current market price of a cryptocurrency token. \
                          Takes the token id (e.g. 'bitcoin', 'ethereum', 'solana') \
                          and an optional quote currency (default 'usd')."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "token": {
                        "type": "string",
                        "description": "Token id in lowercase, e.g. 'bitcoin'"
                    },
                    "currency": {
                        "type": "string",
                        "description": "Quote currency code, default 'usd'"
                    }
                },
                "required": ["token"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(
        &self,
        _ctx: &SkillContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, SkillError> {
        let args: TokenPriceArgs = serde_json::from_value(args)
            .map_err(|e| SkillError::InvalidArguments(e.to_string()))?;
        let token = args.token.trim().to_lowercase();
        let currency = args.currency.trim().to_lowercase();
        if token.is_empty() {
            return Err(SkillError::InvalidArguments("token must not be empty".into()));
        }

        let mut request = self
            .http
            .get(format!("{PRICE_API_BASE}/simple/price"))
            .query(&[("ids", token.as_str()), ("vs_currencies", currency.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key.expose_secret());
        }

        let response = request.send().await.map_err(skill_http_error)?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SkillError::Credential(format!("price API rejected key ({status})")));
        }
        if !status.is_success() {
            return Err(SkillError::Execution(format!("price API returned {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SkillError::Execution(format!("invalid price API response: {e}")))?;
        let price = body
            .get(&token)
            .and_then(|entry| entry.get(&currency))
            .cloned()
            .ok_or_else(|| SkillError::Execution(format!("no price for token '{token}'")))?;

        Ok(json!({
            "token": token,
            "currency": currency,
            "price": price,
        }))
    }
}
