//! SQLite agent repository implementation.

use agentry_core::repository::AgentRepository;
use agentry_types::agent::{Agent, AgentConfig, AgentId};
use agentry_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `AgentRepository`.
#[derive(Clone)]
pub struct SqliteAgentRepository {
    pool: DatabasePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn agent_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Agent, RepositoryError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let id = id
        .parse::<AgentId>()
        .map_err(|e| RepositoryError::Query(format!("invalid agent id: {e}")))?;

    let config_json: String = row
        .try_get("config")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let config: AgentConfig = serde_json::from_str(&config_json)
        .map_err(|e| RepositoryError::Query(format!("invalid config JSON: {e}")))?;

    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let updated_at: String = row
        .try_get("updated_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(Agent {
        id,
        name: row
            .try_get("name")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        owner: row
            .try_get("owner")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        config,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl AgentRepository for SqliteAgentRepository {
    async fn get(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Agent>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM agents ORDER BY created_at ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn upsert(&self, agent: &Agent) -> Result<bool, RepositoryError> {
        let config_json = serde_json::to_string(&agent.config)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Writer pool has a single connection, so the existence check and
        // the upsert below cannot interleave with another writer.
        let existed: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM agents WHERE id = ?")
            .bind(agent.id.as_str())
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO agents (id, name, owner, config, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               owner = excluded.owner,
               config = excluded.config,
               updated_at = excluded.updated_at",
        )
        .bind(agent.id.as_str())
        .bind(&agent.name)
        .bind(&agent.owner)
        .bind(&config_json)
        .bind(format_datetime(&agent.created_at))
        .bind(format_datetime(&agent.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(existed.is_none())
    }

    async fn delete(&self, id: &AgentId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM agents WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}
