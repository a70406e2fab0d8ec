use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;

use super::{ok, ApiResponse};
use crate::common::{BatchId, ClientId, VendorSupplyId};
use crate::domains::matching::actions::{
    find_buyers_for_inventory, find_buyers_for_vendor_supply, find_client_needs_for_batch,
    find_client_needs_for_vendor_supply, get_smart_opportunities, DEFAULT_OPPORTUNITY_LIMIT,
};
use crate::domains::matching::types::{MatchResult, Opportunity};
use crate::domains::supply::adapters::{client_purchase_patterns, find_lapsed_buyers};
use crate::domains::supply::models::{LapsedBuyer, PurchasePattern};
use crate::error::MatchingResult;
use crate::server::app::AppState;

type ApiResult<T> = MatchingResult<Json<ApiResponse<T>>>;

#[derive(Debug, Default, Deserialize)]
pub struct OpportunityQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatternQuery {
    pub min_purchases: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LapsedQuery {
    pub days: Option<i64>,
}

pub async fn inventory_buyers_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<BatchId>,
) -> ApiResult<Vec<MatchResult>> {
    Ok(ok(find_buyers_for_inventory(id, &state.deps).await?))
}

pub async fn vendor_supply_buyers_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<VendorSupplyId>,
) -> ApiResult<Vec<MatchResult>> {
    Ok(ok(find_buyers_for_vendor_supply(id, &state.deps).await?))
}

pub async fn inventory_needs_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<BatchId>,
) -> Json<ApiResponse<Vec<MatchResult>>> {
    ok(find_client_needs_for_batch(id, &state.deps).await)
}

pub async fn vendor_supply_needs_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<VendorSupplyId>,
) -> Json<ApiResponse<Vec<MatchResult>>> {
    ok(find_client_needs_for_vendor_supply(id, &state.deps).await)
}

pub async fn opportunities_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<OpportunityQuery>,
) -> ApiResult<Vec<Opportunity>> {
    let limit = query.limit.unwrap_or(DEFAULT_OPPORTUNITY_LIMIT);
    Ok(ok(get_smart_opportunities(limit, &state.deps).await?))
}

pub async fn client_patterns_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientId>,
    Query(query): Query<PatternQuery>,
) -> ApiResult<Vec<PurchasePattern>> {
    Ok(ok(client_purchase_patterns(id, query.min_purchases, &state.deps).await?))
}

pub async fn lapsed_buyers_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<LapsedQuery>,
) -> ApiResult<Vec<LapsedBuyer>> {
    Ok(ok(find_lapsed_buyers(query.days, &state.deps).await?))
}
