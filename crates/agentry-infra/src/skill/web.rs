//! Generic web-access skill: fetch a URL and return its text content.

use serde::Deserialize;
use serde_json::json;

use agentry_core::skill::{Skill, SkillContext};
use agentry_types::skill::{SkillCategory, SkillError, ToolSpec};

use super::skill_http_error;

/// Response bodies are truncated to keep tool observations within a sane
/// share of the context window.
const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Deserialize)]
struct FetchUrlArgs {
    url: String,
}

/// Fetches a URL over HTTP(S) and returns status, content type, and a
/// truncated body.
pub struct FetchUrlSkill {
    http: reqwest::Client,
}

impl FetchUrlSkill {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Skill for FetchUrlSkill {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn category(&self) -> SkillCategory {
        SkillCategory::Web
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "fetch_url".into(),
            description: "Fetch the contents of a web page or API endpoint by URL. \
                          Returns the HTTP status and the response body as text, \
                          truncated for long pages."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Absolute http:// or https:// URL to fetch"
                    }
                },
                "required": ["url"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(
        &self,
        _ctx: &SkillContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, SkillError> {
        let args: FetchUrlArgs = serde_json::from_value(args)
            .map_err(|e| SkillError::InvalidArguments(e.to_string()))?;
        if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
            return Err(SkillError::InvalidArguments(format!(
                "url must be http(s), got '{}'",
                args.url
            )));
        }

        let response = self
            .http
            .get(&args.url)
            .send()
            .await
            .map_err(skill_http_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await.map_err(skill_http_error)?;

        let truncated = body.len() > MAX_BODY_BYTES;
        let body = if truncated {
            let mut end = MAX_BODY_BYTES;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            &body[..end]
        } else {
            body.as_str()
        };

        Ok(json!({
            "url": args.url,
            "status": status,
            "content_type": content_type,
            "truncated": truncated,
            "body": body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::testutil::null_ctx;
    use serde_json::json;

    fn skill() -> FetchUrlSkill {
        FetchUrlSkill::new(reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_rejects_missing_url() {
        let err = skill().call(&null_ctx("web-test"), json!({})).await.unwrap_err();
        assert!(matches!(err, SkillError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let err = skill()
            .call(&null_ctx("web-test"), json!({"url": "ftp://example.com"}))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::InvalidArguments(_)));
    }

    #[test]
    fn test_spec_declares_required_url() {
        let spec = skill().spec();
        assert_eq!(spec.name, "fetch_url");
        assert_eq!(spec.parameters["required"], json!(["url"]));
    }
}
