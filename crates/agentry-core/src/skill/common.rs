//! Built-in skills with no credentials or external dependencies.

use chrono::Utc;
use serde_json::json;

use agentry_types::skill::{SkillCategory, SkillError, ToolSpec};

use super::{Skill, SkillContext};

/// Reports the current UTC time.
pub struct CurrentTimeSkill;

impl Skill for CurrentTimeSkill {
    fn name(&self) -> &str {
        "current_time"
    }

    fn category(&self) -> SkillCategory {
        SkillCategory::Common
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "current_time".into(),
            description: "Get the current date and time in UTC.".into(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }

    async fn call(
        &self,
        _ctx: &SkillContext,
        _args: serde_json::Value,
    ) -> Result<serde_json::Value, SkillError> {
        Ok(json!({ "utc": Utc::now().to_rfc3339() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::testutil::null_ctx;

    #[tokio::test]
    async fn test_current_time_returns_rfc3339() {
        let skill = CurrentTimeSkill;
        let out = skill
            .call(&null_ctx("common-test"), serde_json::json!({}))
            .await
            .unwrap();
        let ts = out["utc"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
