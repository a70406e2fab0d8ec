use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use super::{ok, ApiResponse};
use crate::common::ClientNeedId;
use crate::domains::matching::actions::{find_matches_for_need, get_all_active_needs_with_matches};
use crate::domains::matching::types::NeedMatches;
use crate::domains::needs::actions::{
    cancel_need, delete_need, expire_old_needs, fulfill_need, get_need, list_needs_with_match_counts,
    update_need, NeedWithMatchCount,
};
use crate::domains::needs::models::{ClientNeed, NeedFilter, NeedUpdate, NewClientNeed};
use crate::domains::orders::actions::{create_need_and_find_matches, NeedWithMatches};
use crate::error::MatchingResult;
use crate::server::app::AppState;

type ApiResult<T> = MatchingResult<Json<ApiResponse<T>>>;

#[derive(Debug, Serialize)]
pub struct ExpiredCount {
    pub expired_count: u64,
}

pub async fn create_need_handler(
    Extension(state): Extension<AppState>,
    Json(input): Json<NewClientNeed>,
) -> ApiResult<NeedWithMatches> {
    Ok(ok(create_need_and_find_matches(input, &state.deps).await?))
}

pub async fn list_needs_handler(
    Extension(state): Extension<AppState>,
    Query(filter): Query<NeedFilter>,
) -> ApiResult<Vec<NeedWithMatchCount>> {
    Ok(ok(list_needs_with_match_counts(&filter, &state.deps).await?))
}

pub async fn needs_with_matches_handler(Extension(state): Extension<AppState>) -> ApiResult<Vec<NeedMatches>> {
    Ok(ok(get_all_active_needs_with_matches(&state.deps).await?))
}

pub async fn get_need_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientNeedId>,
) -> ApiResult<ClientNeed> {
    Ok(ok(get_need(id, &state.deps).await?))
}

pub async fn update_need_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientNeedId>,
    Json(update): Json<NeedUpdate>,
) -> ApiResult<ClientNeed> {
    Ok(ok(update_need(id, update, &state.deps).await?))
}

pub async fn fulfill_need_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientNeedId>,
) -> ApiResult<ClientNeed> {
    Ok(ok(fulfill_need(id, &state.deps).await?))
}

pub async fn cancel_need_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientNeedId>,
) -> ApiResult<ClientNeed> {
    Ok(ok(cancel_need(id, &state.deps).await?))
}

pub async fn delete_need_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientNeedId>,
) -> ApiResult<bool> {
    delete_need(id, &state.deps).await?;
    Ok(ok(true))
}

pub async fn need_matches_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientNeedId>,
) -> ApiResult<NeedMatches> {
    Ok(ok(find_matches_for_need(id, &state.deps).await?))
}

pub async fn expire_needs_handler(Extension(state): Extension<AppState>) -> ApiResult<ExpiredCount> {
    let expired_count = expire_old_needs(Utc::now(), &state.deps).await?;
    Ok(ok(ExpiredCount { expired_count }))
}
