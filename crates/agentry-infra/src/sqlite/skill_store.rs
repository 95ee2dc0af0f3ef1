//! SQLite skill store implementation.

use agentry_core::skill::SkillStore;
use agentry_types::agent::AgentId;
use agentry_types::error::RepositoryError;
use agentry_types::store::{SkillStoreEntry, SkillStoreScope};
use chrono::Utc;
use sqlx::Row;

use super::agent::{format_datetime, parse_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `SkillStore`.
///
/// Rows cascade-delete with the owning agent.
#[derive(Clone)]
pub struct SqliteSkillStore {
    pool: DatabasePool,
}

impl SqliteSkillStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl SkillStore for SqliteSkillStore {
    async fn get(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        let row = sqlx::query(
            "SELECT value FROM skill_data
             WHERE agent_id = ? AND scope = ? AND scope_key = ? AND skill = ? AND key = ?",
        )
        .bind(agent_id.as_str())
        .bind(scope.kind())
        .bind(scope.key())
        .bind(skill)
        .bind(key)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            let value: String = row
                .try_get("value")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            serde_json::from_str(&value)
                .map_err(|e| RepositoryError::Query(format!("invalid value JSON: {e}")))
        })
        .transpose()
    }

    async fn set(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());
        sqlx::query(
            "INSERT INTO skill_data (agent_id, scope, scope_key, skill, key, value, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(agent_id, scope, scope_key, skill, key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
        )
        .bind(agent_id.as_str())
        .bind(scope.kind())
        .bind(scope.key())
        .bind(skill)
        .bind(key)
        .bind(value.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn delete(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "DELETE FROM skill_data
             WHERE agent_id = ? AND scope = ? AND scope_key = ? AND skill = ? AND key = ?",
        )
        .bind(agent_id.as_str())
        .bind(scope.kind())
        .bind(scope.key())
        .bind(skill)
        .bind(key)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn list(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
    ) -> Result<Vec<SkillStoreEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT key, value, created_at, updated_at FROM skill_data
             WHERE agent_id = ? AND scope = ? AND scope_key = ? AND skill = ?
             ORDER BY key ASC",
        )
        .bind(agent_id.as_str())
        .bind(scope.kind())
        .bind(scope.key())
        .bind(skill)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let get = |e: sqlx::Error| RepositoryError::Query(e.to_string());
                let value: String = row.try_get("value").map_err(get)?;
                let created_at: String = row.try_get("created_at").map_err(get)?;
                let updated_at: String = row.try_get("updated_at").map_err(get)?;
                Ok(SkillStoreEntry {
                    agent_id: agent_id.clone(),
                    scope: scope.clone(),
                    skill: skill.to_string(),
                    key: row.try_get("key").map_err(get)?,
                    value: serde_json::from_str(&value)
                        .map_err(|e| RepositoryError::Query(format!("invalid value JSON: {e}")))?,
                    created_at: parse_datetime(&created_at)?,
                    updated_at: parse_datetime(&updated_at)?,
                })
            })
            .collect()
    }
}
