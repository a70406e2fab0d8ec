//! Create, read, update and retire client needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::ClientNeedId;
use crate::domains::needs::models::{
    ClientNeed, NeedFilter, NeedInsert, NeedStatus, NeedUpdate, NewClientNeed,
};
use crate::error::{MatchingError, MatchingResult};
use crate::kernel::ServerDeps;

pub const DUPLICATE_NEED_MESSAGE: &str = "A similar active need already exists for this client";

/// Result of `create_need`. A duplicate is a defined outcome, not an error:
/// the existing need is returned with `is_duplicate` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNeedOutcome {
    pub need: ClientNeed,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Create a need unless the client already has an ACTIVE one with the same
/// strain/category/subcategory/grade.
pub async fn create_need(input: NewClientNeed, deps: &ServerDeps) -> MatchingResult<CreateNeedOutcome> {
    input.validate()?;

    match deps.needs.insert_need_unique(input).await? {
        NeedInsert::Created(need) => {
            info!(need_id = %need.id, client_id = %need.client_id, "Client need created");
            Ok(CreateNeedOutcome {
                need,
                is_duplicate: false,
                message: None,
            })
        }
        NeedInsert::Duplicate(need) => {
            debug!(need_id = %need.id, client_id = %need.client_id, "Duplicate need submitted");
            Ok(CreateNeedOutcome {
                need,
                is_duplicate: true,
                message: Some(DUPLICATE_NEED_MESSAGE.to_string()),
            })
        }
    }
}

pub async fn get_need(id: ClientNeedId, deps: &ServerDeps) -> MatchingResult<ClientNeed> {
    deps.needs
        .find_need(id)
        .await?
        .ok_or_else(|| MatchingError::not_found("Client need", id))
}

pub async fn list_needs(filter: &NeedFilter, deps: &ServerDeps) -> MatchingResult<Vec<ClientNeed>> {
    deps.needs.list_needs(filter).await
}

pub async fn update_need(id: ClientNeedId, update: NeedUpdate, deps: &ServerDeps) -> MatchingResult<ClientNeed> {
    let mut need = get_need(id, deps).await?;
    need.apply(update, Utc::now());
    need.validate()?;
    deps.needs.save_need(&need).await
}

pub async fn fulfill_need(id: ClientNeedId, deps: &ServerDeps) -> MatchingResult<ClientNeed> {
    let mut need = get_need(id, deps).await?;
    let now = Utc::now();
    need.status = NeedStatus::Fulfilled;
    need.fulfilled_at = Some(now);
    need.updated_at = now;
    info!(need_id = %id, "Client need fulfilled");
    deps.needs.save_need(&need).await
}

pub async fn cancel_need(id: ClientNeedId, deps: &ServerDeps) -> MatchingResult<ClientNeed> {
    let mut need = get_need(id, deps).await?;
    need.status = NeedStatus::Cancelled;
    need.updated_at = Utc::now();
    info!(need_id = %id, "Client need cancelled");
    deps.needs.save_need(&need).await
}

/// Soft delete. The need disappears from reads and frees its signature.
pub async fn delete_need(id: ClientNeedId, deps: &ServerDeps) -> MatchingResult<()> {
    let mut need = get_need(id, deps).await?;
    let now = Utc::now();
    need.deleted_at = Some(now);
    need.updated_at = now;
    deps.needs.save_need(&need).await?;
    info!(need_id = %id, "Client need deleted");
    Ok(())
}

/// ACTIVE needs past `expires_at` become EXPIRED. Returns how many changed.
pub async fn expire_old_needs(now: DateTime<Utc>, deps: &ServerDeps) -> MatchingResult<u64> {
    let expired = deps.needs.expire_needs(now).await?;
    if expired > 0 {
        info!(expired, "Expired client needs");
    }
    Ok(expired)
}
