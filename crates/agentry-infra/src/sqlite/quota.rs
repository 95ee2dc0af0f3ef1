//! SQLite quota repository implementation.
//!
//! The reset-check-increment cycle runs inside a single transaction on the
//! single-connection writer pool, so two racing requests with one unit of
//! headroom left serialize and exactly one succeeds.

use agentry_core::quota::QuotaRepository;
use agentry_types::agent::AgentId;
use agentry_types::error::RepositoryError;
use agentry_types::quota::{QuotaError, QuotaKind, QuotaLimits, QuotaRecord, QuotaUsage};
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, Transaction};

use super::agent::{format_datetime, parse_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `QuotaRepository`.
#[derive(Clone)]
pub struct SqliteQuotaRepository {
    pool: DatabasePool,
}

impl SqliteQuotaRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn load_or_insert(
        tx: &mut Transaction<'_, Sqlite>,
        agent_id: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, RepositoryError> {
        let row = sqlx::query("SELECT * FROM agent_quotas WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if let Some(row) = row {
            return record_from_row(agent_id, &row);
        }

        let record = QuotaRecord::new(agent_id.clone(), now);
        sqlx::query(
            "INSERT INTO agent_quotas (
                agent_id,
                message_count_total, message_limit_total,
                message_count_monthly, message_limit_monthly,
                message_count_daily, message_limit_daily,
                autonomous_count_total, autonomous_limit_total,
                autonomous_count_monthly, autonomous_limit_monthly,
                daily_reset_at, monthly_reset_at,
                last_message_at, last_autonomous_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(agent_id.as_str())
        .bind(record.message_count_total)
        .bind(record.message_limit_total)
        .bind(record.message_count_monthly)
        .bind(record.message_limit_monthly)
        .bind(record.message_count_daily)
        .bind(record.message_limit_daily)
        .bind(record.autonomous_count_total)
        .bind(record.autonomous_limit_total)
        .bind(record.autonomous_count_monthly)
        .bind(record.autonomous_limit_monthly)
        .bind(format_datetime(&record.daily_reset_at))
        .bind(format_datetime(&record.monthly_reset_at))
        .bind(record.last_message_at.as_ref().map(format_datetime))
        .bind(record.last_autonomous_at.as_ref().map(format_datetime))
        .bind(format_datetime(&record.updated_at))
        .execute(&mut **tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(record)
    }

    async fn persist(
        tx: &mut Transaction<'_, Sqlite>,
        record: &QuotaRecord,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE agent_quotas SET
                message_count_total = ?, message_limit_total = ?,
                message_count_monthly = ?, message_limit_monthly = ?,
                message_count_daily = ?, message_limit_daily = ?,
                autonomous_count_total = ?, autonomous_limit_total = ?,
                autonomous_count_monthly = ?, autonomous_limit_monthly = ?,
                daily_reset_at = ?, monthly_reset_at = ?,
                last_message_at = ?, last_autonomous_at = ?, updated_at = ?
             WHERE agent_id = ?",
        )
        .bind(record.message_count_total)
        .bind(record.message_limit_total)
        .bind(record.message_count_monthly)
        .bind(record.message_limit_monthly)
        .bind(record.message_count_daily)
        .bind(record.message_limit_daily)
        .bind(record.autonomous_count_total)
        .bind(record.autonomous_limit_total)
        .bind(record.autonomous_count_monthly)
        .bind(record.autonomous_limit_monthly)
        .bind(format_datetime(&record.daily_reset_at))
        .bind(format_datetime(&record.monthly_reset_at))
        .bind(record.last_message_at.as_ref().map(format_datetime))
        .bind(record.last_autonomous_at.as_ref().map(format_datetime))
        .bind(format_datetime(&record.updated_at))
        .bind(record.agent_id.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}

fn record_from_row(
    agent_id: &AgentId,
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuotaRecord, RepositoryError> {
    let get_i64 = |name: &str| -> Result<i64, RepositoryError> {
        row.try_get(name)
            .map_err(|e| RepositoryError::Query(e.to_string()))
    };
    let get_dt = |name: &str| -> Result<DateTime<Utc>, RepositoryError> {
        let s: String = row
            .try_get(name)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        parse_datetime(&s)
    };
    let get_opt_dt = |name: &str| -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let s: Option<String> = row
            .try_get(name)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        s.as_deref().map(parse_datetime).transpose()
    };

    Ok(QuotaRecord {
        agent_id: agent_id.clone(),
        message_count_total: get_i64("message_count_total")?,
        message_limit_total: get_i64("message_limit_total")?,
        message_count_monthly: get_i64("message_count_monthly")?,
        message_limit_monthly: get_i64("message_limit_monthly")?,
        message_count_daily: get_i64("message_count_daily")?,
        message_limit_daily: get_i64("message_limit_daily")?,
        autonomous_count_total: get_i64("autonomous_count_total")?,
        autonomous_limit_total: get_i64("autonomous_limit_total")?,
        autonomous_count_monthly: get_i64("autonomous_count_monthly")?,
        autonomous_limit_monthly: get_i64("autonomous_limit_monthly")?,
        daily_reset_at: get_dt("daily_reset_at")?,
        monthly_reset_at: get_dt("monthly_reset_at")?,
        last_message_at: get_opt_dt("last_message_at")?,
        last_autonomous_at: get_opt_dt("last_autonomous_at")?,
        updated_at: get_dt("updated_at")?,
    })
}

impl QuotaRepository for SqliteQuotaRepository {
    async fn get_or_create(
        &self,
        agent_id: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let record = Self::load_or_insert(&mut tx, agent_id, now).await?;
        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(record)
    }

    async fn check_and_increment(
        &self,
        agent_id: &AgentId,
        kind: QuotaKind,
        now: DateTime<Utc>,
    ) -> Result<QuotaUsage, QuotaError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut record = Self::load_or_insert(&mut tx, agent_id, now).await?;
        let reset = record.reset_expired_windows(now);

        if let Some((window, usage, limit)) = record.exhausted_window(kind) {
            // Window resets still count as state changes worth keeping.
            if reset {
                Self::persist(&mut tx, &record).await?;
            }
            tx.commit()
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            return Err(QuotaError::Exceeded {
                kind,
                window,
                usage,
                limit,
            });
        }

        record.apply(kind, now);
        Self::persist(&mut tx, &record).await?;
        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(record.usage(kind))
    }

    async fn set_limits(
        &self,
        agent_id: &AgentId,
        limits: &QuotaLimits,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let mut record = Self::load_or_insert(&mut tx, agent_id, now).await?;
        record.set_limits(limits, now);
        Self::persist(&mut tx, &record).await?;
        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::testutil::temp_pool;
    use crate::sqlite::SqliteAgentRepository;
    use agentry_core::repository::AgentRepository;
    use agentry_types::agent::{Agent, AgentConfig};
    use agentry_types::quota::QuotaWindow;
    use std::sync::Arc;

    async fn seeded(pool: &DatabasePool, id: &str) -> AgentId {
        let agents = SqliteAgentRepository::new(pool.clone());
        let agent_id = AgentId::new(id).unwrap();
        agents
            .upsert(&Agent {
                id: agent_id.clone(),
                name: "Quota Test".into(),
                owner: None,
                config: AgentConfig::default(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        agent_id
    }

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_rejects_at_limit_without_consuming() {
        let (_dir, pool) = temp_pool().await;
        let agent_id = seeded(&pool, "q-limit").await;
        let repo = SqliteQuotaRepository::new(pool);
        let now = at("2026-08-25T10:00:00Z");

        repo.set_limits(
            &agent_id,
            &QuotaLimits {
                message_limit_daily: Some(1),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();

        repo.check_and_increment(&agent_id, QuotaKind::Message, now)
            .await
            .unwrap();
        let err = repo
            .check_and_increment(&agent_id, QuotaKind::Message, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuotaError::Exceeded {
                window: QuotaWindow::Daily,
                ..
            }
        ));

        let record = repo.get_or_create(&agent_id, now).await.unwrap();
        assert_eq!(record.message_count_daily, 1);
    }

    #[tokio::test]
    async fn test_daily_window_resets_next_day() {
        let (_dir, pool) = temp_pool().await;
        let agent_id = seeded(&pool, "q-reset").await;
        let repo = SqliteQuotaRepository::new(pool);
        let today = at("2026-08-25T23:00:00Z");

        repo.set_limits(
            &agent_id,
            &QuotaLimits {
                message_limit_daily: Some(1),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap();
        repo.check_and_increment(&agent_id, QuotaKind::Message, today)
            .await
            .unwrap();
        assert!(
            repo.check_and_increment(&agent_id, QuotaKind::Message, today)
                .await
                .is_err()
        );

        let tomorrow = at("2026-08-26T00:00:00Z");
        let usage = repo
            .check_and_increment(&agent_id, QuotaKind::Message, tomorrow)
            .await
            .unwrap();
        assert_eq!(usage.daily, Some((1, 1)));
        assert_eq!(usage.total.0, 2);
    }

    #[tokio::test]
    async fn test_concurrent_increments_never_exceed_limit() {
        let (_dir, pool) = temp_pool().await;
        let agent_id = seeded(&pool, "q-race").await;
        let repo = Arc::new(SqliteQuotaRepository::new(pool));
        let now = Utc::now();

        repo.set_limits(
            &agent_id,
            &QuotaLimits {
                message_limit_daily: Some(5),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let repo = repo.clone();
            let agent_id = agent_id.clone();
            handles.push(tokio::spawn(async move {
                repo.check_and_increment(&agent_id, QuotaKind::Message, Utc::now())
                    .await
                    .is_ok()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);

        let record = repo.get_or_create(&agent_id, now).await.unwrap();
        assert_eq!(record.message_count_daily, 5);
    }

    #[tokio::test]
    async fn test_autonomous_counts_separately() {
        let (_dir, pool) = temp_pool().await;
        let agent_id = seeded(&pool, "q-auto").await;
        let repo = SqliteQuotaRepository::new(pool);
        let now = Utc::now();

        repo.check_and_increment(&agent_id, QuotaKind::AutonomousAction, now)
            .await
            .unwrap();
        let record = repo.get_or_create(&agent_id, now).await.unwrap();
        assert_eq!(record.autonomous_count_total, 1);
        assert_eq!(record.message_count_total, 0);
        assert!(record.last_autonomous_at.is_some());
        assert!(record.last_message_at.is_none());
    }
}
