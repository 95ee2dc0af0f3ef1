//! QuotaRepository trait definition.
//!
//! The window arithmetic itself is pure and lives on
//! [`agentry_types::quota::QuotaRecord`]; this trait is the transactional
//! seam the persistence layer implements.

use agentry_types::agent::AgentId;
use agentry_types::error::RepositoryError;
use agentry_types::quota::{QuotaError, QuotaLimits, QuotaRecord, QuotaUsage};
use chrono::{DateTime, Utc};

/// Repository trait for per-agent quota accounting.
///
/// `check_and_increment` is the hot path and must be atomic under
/// concurrency: two racing calls with one unit of headroom left must not
/// both succeed. Implementations achieve this by running the
/// reset-check-increment cycle inside a single write transaction.
pub trait QuotaRepository: Send + Sync {
    /// Get the agent's quota record, creating a default one if absent.
    fn get_or_create(
        &self,
        agent_id: &AgentId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<QuotaRecord, RepositoryError>> + Send;

    /// Atomically reset expired windows, verify headroom for `kind`, and
    /// count one action. Returns the post-increment usage snapshot, or
    /// `QuotaError::Exceeded` without consuming anything.
    fn check_and_increment(
        &self,
        agent_id: &AgentId,
        kind: agentry_types::quota::QuotaKind,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<QuotaUsage, QuotaError>> + Send;

    /// Apply admin limit overrides, creating the record if absent.
    fn set_limits(
        &self,
        agent_id: &AgentId,
        limits: &QuotaLimits,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<QuotaRecord, RepositoryError>> + Send;
}

impl<T: QuotaRepository> QuotaRepository for std::sync::Arc<T> {
    async fn get_or_create(
        &self,
        agent_id: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, RepositoryError> {
        (**self).get_or_create(agent_id, now).await
    }

    async fn check_and_increment(
        &self,
        agent_id: &AgentId,
        kind: agentry_types::quota::QuotaKind,
        now: DateTime<Utc>,
    ) -> Result<QuotaUsage, QuotaError> {
        (**self).check_and_increment(agent_id, kind, now).await
    }

    async fn set_limits(
        &self,
        agent_id: &AgentId,
        limits: &QuotaLimits,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, RepositoryError> {
        (**self).set_limits(agent_id, limits, now).await
    }
}
