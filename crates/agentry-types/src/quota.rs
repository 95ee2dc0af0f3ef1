//! Per-agent action quotas over rolling daily/monthly/total windows.
//!
//! `QuotaRecord` holds the counters and limits; all window arithmetic is
//! pure and synchronous so the persistence layer can wrap the
//! reset-check-increment cycle in a single transaction.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::agent::AgentId;
use crate::error::RepositoryError;

/// The kind of quota-limited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaKind {
    Message,
    AutonomousAction,
}

impl fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaKind::Message => write!(f, "message"),
            QuotaKind::AutonomousAction => write!(f, "autonomous_action"),
        }
    }
}

/// A counting window for a quota kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaWindow {
    Daily,
    Monthly,
    Total,
}

impl fmt::Display for QuotaWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaWindow::Daily => write!(f, "daily"),
            QuotaWindow::Monthly => write!(f, "monthly"),
            QuotaWindow::Total => write!(f, "total"),
        }
    }
}

/// Quota failures. `Exceeded` carries the specific window and usage so
/// callers can build a precise error message.
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("{kind} quota exceeded: {window} window at {usage}/{limit}")]
    Exceeded {
        kind: QuotaKind,
        window: QuotaWindow,
        usage: i64,
        limit: i64,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Snapshot of usage returned by a successful check-and-increment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub kind: QuotaKind,
    pub daily: Option<(i64, i64)>,
    pub monthly: (i64, i64),
    pub total: (i64, i64),
}

/// Effectively-unlimited default for the self-hosted posture.
pub const DEFAULT_LIMIT: i64 = 99_999_999;

/// Per-agent quota counters with their limits and window reset stamps.
///
/// Messages count against daily/monthly/total windows; autonomous runs
/// against monthly/total. `daily_reset_at` and `monthly_reset_at` record the
/// start of the window the counters currently belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub agent_id: AgentId,
    pub message_count_total: i64,
    pub message_limit_total: i64,
    pub message_count_monthly: i64,
    pub message_limit_monthly: i64,
    pub message_count_daily: i64,
    pub message_limit_daily: i64,
    pub autonomous_count_total: i64,
    pub autonomous_limit_total: i64,
    pub autonomous_count_monthly: i64,
    pub autonomous_limit_monthly: i64,
    pub daily_reset_at: DateTime<Utc>,
    pub monthly_reset_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_autonomous_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Start of the UTC calendar day containing `now`.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Start of the UTC calendar month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

impl QuotaRecord {
    /// Fresh record with default (effectively unlimited) limits, windows
    /// anchored at `now`.
    pub fn new(agent_id: AgentId, now: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            message_count_total: 0,
            message_limit_total: DEFAULT_LIMIT,
            message_count_monthly: 0,
            message_limit_monthly: DEFAULT_LIMIT,
            message_count_daily: 0,
            message_limit_daily: DEFAULT_LIMIT,
            autonomous_count_total: 0,
            autonomous_limit_total: DEFAULT_LIMIT,
            autonomous_count_monthly: 0,
            autonomous_limit_monthly: DEFAULT_LIMIT,
            daily_reset_at: day_start(now),
            monthly_reset_at: month_start(now),
            last_message_at: None,
            last_autonomous_at: None,
            updated_at: now,
        }
    }

    /// Lazily reset any window whose boundary has been crossed.
    ///
    /// The boundary is exclusive of the new window's start: the first call at
    /// or after UTC midnight (daily) or the first of the month (monthly)
    /// zeroes the counters before any limit comparison. Returns true if
    /// anything changed.
    pub fn reset_expired_windows(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        let day = day_start(now);
        if self.daily_reset_at < day {
            self.message_count_daily = 0;
            self.daily_reset_at = day;
            changed = true;
        }

        let month = month_start(now);
        if self.monthly_reset_at < month {
            self.message_count_monthly = 0;
            self.autonomous_count_monthly = 0;
            self.monthly_reset_at = month;
            changed = true;
        }

        changed
    }

    /// First exhausted window for `kind`, checked total -> monthly -> daily.
    ///
    /// Call `reset_expired_windows` first; this performs no resets.
    pub fn exhausted_window(&self, kind: QuotaKind) -> Option<(QuotaWindow, i64, i64)> {
        let windows: &[(QuotaWindow, i64, i64)] = match kind {
            QuotaKind::Message => &[
                (QuotaWindow::Total, self.message_count_total, self.message_limit_total),
                (
                    QuotaWindow::Monthly,
                    self.message_count_monthly,
                    self.message_limit_monthly,
                ),
                (QuotaWindow::Daily, self.message_count_daily, self.message_limit_daily),
            ],
            QuotaKind::AutonomousAction => &[
                (
                    QuotaWindow::Total,
                    self.autonomous_count_total,
                    self.autonomous_limit_total,
                ),
                (
                    QuotaWindow::Monthly,
                    self.autonomous_count_monthly,
                    self.autonomous_limit_monthly,
                ),
            ],
        };

        windows
            .iter()
            .find(|(_, count, limit)| count >= limit)
            .copied()
    }

    /// Increment every window applicable to `kind`. Only call after
    /// `exhausted_window` returned None.
    pub fn apply(&mut self, kind: QuotaKind, now: DateTime<Utc>) {
        match kind {
            QuotaKind::Message => {
                self.message_count_total += 1;
                self.message_count_monthly += 1;
                self.message_count_daily += 1;
                self.last_message_at = Some(now);
            }
            QuotaKind::AutonomousAction => {
                self.autonomous_count_total += 1;
                self.autonomous_count_monthly += 1;
                self.last_autonomous_at = Some(now);
            }
        }
        self.updated_at = now;
    }

    /// Usage snapshot for `kind`.
    pub fn usage(&self, kind: QuotaKind) -> QuotaUsage {
        match kind {
            QuotaKind::Message => QuotaUsage {
                kind,
                daily: Some((self.message_count_daily, self.message_limit_daily)),
                monthly: (self.message_count_monthly, self.message_limit_monthly),
                total: (self.message_count_total, self.message_limit_total),
            },
            QuotaKind::AutonomousAction => QuotaUsage {
                kind,
                daily: None,
                monthly: (self.autonomous_count_monthly, self.autonomous_limit_monthly),
                total: (self.autonomous_count_total, self.autonomous_limit_total),
            },
        }
    }
}

/// Limit overrides applied through the admin surface. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub message_limit_total: Option<i64>,
    pub message_limit_monthly: Option<i64>,
    pub message_limit_daily: Option<i64>,
    pub autonomous_limit_total: Option<i64>,
    pub autonomous_limit_monthly: Option<i64>,
}

impl QuotaRecord {
    /// Apply admin limit overrides.
    pub fn set_limits(&mut self, limits: &QuotaLimits, now: DateTime<Utc>) {
        if let Some(v) = limits.message_limit_total {
            self.message_limit_total = v;
        }
        if let Some(v) = limits.message_limit_monthly {
            self.message_limit_monthly = v;
        }
        if let Some(v) = limits.message_limit_daily {
            self.message_limit_daily = v;
        }
        if let Some(v) = limits.autonomous_limit_total {
            self.autonomous_limit_total = v;
        }
        if let Some(v) = limits.autonomous_limit_monthly {
            self.autonomous_limit_monthly = v;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(ts: &str) -> (QuotaRecord, DateTime<Utc>) {
        let now = DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc);
        let id = AgentId::new("quota-test").unwrap();
        (QuotaRecord::new(id, now), now)
    }

    #[test]
    fn test_fresh_record_has_headroom() {
        let (record, _) = record_at("2026-08-25T10:00:00Z");
        assert!(record.exhausted_window(QuotaKind::Message).is_none());
        assert!(record.exhausted_window(QuotaKind::AutonomousAction).is_none());
    }

    #[test]
    fn test_exhaustion_at_exact_limit() {
        let (mut record, now) = record_at("2026-08-25T10:00:00Z");
        record.message_limit_daily = 2;
        record.apply(QuotaKind::Message, now);
        assert!(record.exhausted_window(QuotaKind::Message).is_none());
        record.apply(QuotaKind::Message, now);

        // Boundary test at exactly the limit: 2/2 is exhausted.
        let (window, usage, limit) = record.exhausted_window(QuotaKind::Message).unwrap();
        assert_eq!(window, QuotaWindow::Daily);
        assert_eq!((usage, limit), (2, 2));
    }

    #[test]
    fn test_total_checked_before_daily() {
        let (mut record, now) = record_at("2026-08-25T10:00:00Z");
        record.message_limit_total = 1;
        record.message_limit_daily = 1;
        record.apply(QuotaKind::Message, now);
        let (window, _, _) = record.exhausted_window(QuotaKind::Message).unwrap();
        assert_eq!(window, QuotaWindow::Total);
    }

    #[test]
    fn test_daily_reset_boundary_is_exclusive() {
        let (mut record, now) = record_at("2026-08-25T23:59:59Z");
        record.message_limit_daily = 1;
        record.apply(QuotaKind::Message, now);
        assert!(record.exhausted_window(QuotaKind::Message).is_some());

        // One second before midnight: still the same window, no reset.
        assert!(!record.reset_expired_windows(now));

        // Exactly at midnight the new window starts and the counter resets.
        let midnight = Utc.with_ymd_and_hms(2026, 8, 26, 0, 0, 0).unwrap();
        assert!(record.reset_expired_windows(midnight));
        assert_eq!(record.message_count_daily, 0);
        assert_eq!(record.daily_reset_at, midnight);
        assert!(record.exhausted_window(QuotaKind::Message).is_none());

        // Total survives the daily reset.
        assert_eq!(record.message_count_total, 1);
    }

    #[test]
    fn test_monthly_reset_covers_both_kinds() {
        let (mut record, now) = record_at("2026-08-31T12:00:00Z");
        record.apply(QuotaKind::Message, now);
        record.apply(QuotaKind::AutonomousAction, now);

        let sept = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        assert!(record.reset_expired_windows(sept));
        assert_eq!(record.message_count_monthly, 0);
        assert_eq!(record.autonomous_count_monthly, 0);
        assert_eq!(record.message_count_total, 1);
        assert_eq!(record.autonomous_count_total, 1);
    }

    #[test]
    fn test_reset_is_idempotent_within_window() {
        let (mut record, now) = record_at("2026-08-25T10:00:00Z");
        let later = now + chrono::Duration::hours(3);
        assert!(!record.reset_expired_windows(now));
        assert!(!record.reset_expired_windows(later));
    }

    #[test]
    fn test_autonomous_has_no_daily_window() {
        let (record, _) = record_at("2026-08-25T10:00:00Z");
        assert!(record.usage(QuotaKind::AutonomousAction).daily.is_none());
        assert!(record.usage(QuotaKind::Message).daily.is_some());
    }

    #[test]
    fn test_set_limits_partial() {
        let (mut record, now) = record_at("2026-08-25T10:00:00Z");
        record.set_limits(
            &QuotaLimits {
                message_limit_daily: Some(2),
                ..Default::default()
            },
            now,
        );
        assert_eq!(record.message_limit_daily, 2);
        assert_eq!(record.message_limit_total, DEFAULT_LIMIT);
    }
}
