//! SQLite conversation memory implementation.

use agentry_core::memory::MemoryRepository;
use agentry_core::memory::tokens::{budget_cutoff_seq, take_recent_within_budget};
use agentry_types::agent::AgentId;
use agentry_types::chat::{ChatMessage, Entrypoint, MessageRole, NewChatMessage};
use agentry_types::error::RepositoryError;
use chrono::Utc;
use sqlx::Row;

use super::agent::{format_datetime, parse_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `MemoryRepository`.
#[derive(Clone)]
pub struct SqliteMemoryRepository {
    pool: DatabasePool,
}

impl SqliteMemoryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_desc(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE agent_id = ? AND chat_id = ? ORDER BY seq DESC",
        )
        .bind(agent_id.as_str())
        .bind(chat_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(message_from_row).collect()
    }
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, RepositoryError> {
    let get = |e: sqlx::Error| RepositoryError::Query(e.to_string());

    let agent_id: String = row.try_get("agent_id").map_err(get)?;
    let role: String = row.try_get("role").map_err(get)?;
    let origin: String = row.try_get("origin").map_err(get)?;
    let created_at: String = row.try_get("created_at").map_err(get)?;

    Ok(ChatMessage {
        agent_id: agent_id
            .parse::<AgentId>()
            .map_err(|e| RepositoryError::Query(format!("invalid agent id: {e}")))?,
        chat_id: row.try_get("chat_id").map_err(get)?,
        seq: row.try_get("seq").map_err(get)?,
        role: role
            .parse::<MessageRole>()
            .map_err(RepositoryError::Query)?,
        content: row.try_get("content").map_err(get)?,
        origin: origin
            .parse::<Entrypoint>()
            .map_err(RepositoryError::Query)?,
        author_id: row.try_get("author_id").map_err(get)?,
        created_at: parse_datetime(&created_at)?,
    })
}

impl MemoryRepository for SqliteMemoryRepository {
    async fn append(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        message: NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // MAX+1 inside the write transaction keeps seq gapless and unique
        // even under concurrent appends to the same chat.
        let (seq,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM chat_messages WHERE agent_id = ? AND chat_id = ?",
        )
        .bind(agent_id.as_str())
        .bind(chat_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO chat_messages (agent_id, chat_id, seq, role, content, origin, author_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(agent_id.as_str())
        .bind(chat_id)
        .bind(seq)
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(message.origin.to_string())
        .bind(&message.author_id)
        .bind(format_datetime(&now))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(ChatMessage {
            agent_id: agent_id.clone(),
            chat_id: chat_id.to_string(),
            seq,
            role: message.role,
            content: message.content,
            origin: message.origin,
            author_id: message.author_id,
            created_at: now,
        })
    }

    async fn load_recent(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        token_budget: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let desc = self.fetch_desc(agent_id, chat_id).await?;
        Ok(take_recent_within_budget(desc, token_budget))
    }

    async fn prune(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        token_budget: u32,
    ) -> Result<u64, RepositoryError> {
        let desc = self.fetch_desc(agent_id, chat_id).await?;
        let Some(cutoff) = budget_cutoff_seq(&desc, token_budget) else {
            return Ok(0);
        };

        let result = sqlx::query(
            "DELETE FROM chat_messages WHERE agent_id = ? AND chat_id = ? AND seq < ?",
        )
        .bind(agent_id.as_str())
        .bind(chat_id)
        .bind(cutoff)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn clear(
        &self,
        agent_id: &AgentId,
        chat_id: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        let result = match chat_id {
            Some(chat_id) => {
                sqlx::query("DELETE FROM chat_messages WHERE agent_id = ? AND chat_id = ?")
                    .bind(agent_id.as_str())
                    .bind(chat_id)
                    .execute(&self.pool.writer)
                    .await
            }
            None => sqlx::query("DELETE FROM chat_messages WHERE agent_id = ?")
                .bind(agent_id.as_str())
                .execute(&self.pool.writer)
                .await,
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn list(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE agent_id = ? AND chat_id = ? ORDER BY seq ASC",
        )
        .bind(agent_id.as_str())
        .bind(chat_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(message_from_row).collect()
    }
}
