//! Quota inspection and limit administration.

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;

use agentry_core::quota::QuotaRepository;
use agentry_types::quota::{QuotaLimits, QuotaRecord};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

use super::agent::parse_id;

/// GET /api/v1/agents/:id/quota - Current usage and limits.
pub async fn get_quota(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<QuotaRecord>>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_id(&id)?;
    state.agent_service.get(&id).await?;

    let mut record = state.quotas.get_or_create(&id, Utc::now()).await?;
    // Present current-window counters even when no request has arrived
    // since a boundary.
    record.reset_expired_windows(Utc::now());
    Ok(timer.respond(record))
}

/// PUT /api/v1/agents/:id/quota/limits - Apply limit overrides.
pub async fn set_limits(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(limits): Json<QuotaLimits>,
) -> Result<Json<ApiResponse<QuotaRecord>>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_id(&id)?;
    state.agent_service.get(&id).await?;

    let record = state.quotas.set_limits(&id, &limits, Utc::now()).await?;
    Ok(timer.respond(record))
}
