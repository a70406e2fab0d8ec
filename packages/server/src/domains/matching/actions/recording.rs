use tracing::error;

use crate::common::{ClientId, ClientNeedId, MatchRecordId};
use crate::domains::matching::models::NewMatchRecord;
use crate::domains::matching::types::{Match, SupplySource};
use crate::kernel::ServerDeps;

/// Best-effort audit write. A failure is logged and the match is still
/// returned to the caller.
pub(super) async fn record_match(
    client_id: ClientId,
    client_need_id: Option<ClientNeedId>,
    matched: &Match,
    supply: Option<&SupplySource>,
    deps: &ServerDeps,
) -> Option<MatchRecordId> {
    let record = NewMatchRecord::for_match(client_id, client_need_id, matched, supply);

    match deps.match_records.record(record).await {
        Ok(record) => Some(record.id),
        Err(e) => {
            error!(
                client_id = %client_id,
                source_kind = ?matched.source_kind,
                source_id = matched.source_id,
                error = %e,
                "Failed to record match"
            );
            None
        }
    }
}
