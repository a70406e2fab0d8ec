use tracing::info;

use crate::common::{MatchRecordId, UserId};
use crate::domains::matching::models::{MatchRecord, UserAction};
use crate::error::MatchingResult;
use crate::kernel::ServerDeps;

pub async fn dismiss_match(id: MatchRecordId, actor_id: UserId, deps: &ServerDeps) -> MatchingResult<MatchRecord> {
    let record = deps
        .match_records
        .update_action(id, UserAction::Dismissed, Some(actor_id))
        .await?;
    info!(match_record_id = %id, actor_id = %actor_id, "Match dismissed");
    Ok(record)
}

pub async fn contact_vendor(id: MatchRecordId, actor_id: UserId, deps: &ServerDeps) -> MatchingResult<MatchRecord> {
    let record = deps
        .match_records
        .update_action(id, UserAction::ContactedVendor, Some(actor_id))
        .await?;
    info!(match_record_id = %id, actor_id = %actor_id, "Vendor contacted for match");
    Ok(record)
}
