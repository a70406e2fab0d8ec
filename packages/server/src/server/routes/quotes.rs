use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;

use super::{ok, ApiResponse};
use crate::common::{MatchRecordId, OrderId};
use crate::domains::orders::actions::{convert_quote_to_sale, create_quote_from_match, CreateQuoteInput};
use crate::domains::orders::models::Order;
use crate::error::MatchingResult;
use crate::server::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuoteRequest {
    #[serde(default)]
    pub match_record_id: Option<MatchRecordId>,
}

pub async fn create_quote_handler(
    Extension(state): Extension<AppState>,
    Json(input): Json<CreateQuoteInput>,
) -> MatchingResult<Json<ApiResponse<Order>>> {
    Ok(ok(create_quote_from_match(input, &state.deps).await?))
}

pub async fn convert_quote_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<OrderId>,
    Json(request): Json<ConvertQuoteRequest>,
) -> MatchingResult<Json<ApiResponse<Order>>> {
    Ok(ok(convert_quote_to_sale(id, request.match_record_id, &state.deps).await?))
}
