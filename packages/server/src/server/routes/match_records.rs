use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;

use super::{ok, ApiResponse};
use crate::common::{MatchRecordId, UserId};
use crate::domains::matching::actions::{get_match_analytics, get_match_record, list_match_records};
use crate::domains::matching::models::{MatchAnalytics, MatchRecord, MatchRecordFilter};
use crate::domains::orders::actions::{contact_vendor, dismiss_match};
use crate::error::MatchingResult;
use crate::server::app::AppState;

type ApiResult<T> = MatchingResult<Json<ApiResponse<T>>>;

#[derive(Debug, Deserialize)]
pub struct MatchActionRequest {
    pub actor_id: UserId,
}

pub async fn list_match_records_handler(
    Extension(state): Extension<AppState>,
    Query(filter): Query<MatchRecordFilter>,
) -> ApiResult<Vec<MatchRecord>> {
    Ok(ok(list_match_records(&filter, &state.deps).await?))
}

pub async fn get_match_record_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<MatchRecordId>,
) -> ApiResult<MatchRecord> {
    Ok(ok(get_match_record(id, &state.deps).await?))
}

pub async fn analytics_handler(Extension(state): Extension<AppState>) -> ApiResult<MatchAnalytics> {
    Ok(ok(get_match_analytics(&state.deps).await?))
}

pub async fn dismiss_match_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<MatchRecordId>,
    Json(request): Json<MatchActionRequest>,
) -> ApiResult<MatchRecord> {
    Ok(ok(dismiss_match(id, request.actor_id, &state.deps).await?))
}

pub async fn contact_vendor_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<MatchRecordId>,
    Json(request): Json<MatchActionRequest>,
) -> ApiResult<MatchRecord> {
    Ok(ok(contact_vendor(id, request.actor_id, &state.deps).await?))
}
