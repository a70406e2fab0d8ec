use crate::common::MatchRecordId;
use crate::domains::matching::models::{MatchAnalytics, MatchRecord, MatchRecordFilter};
use crate::error::{MatchingError, MatchingResult};
use crate::kernel::ServerDeps;

pub async fn get_match_record(id: MatchRecordId, deps: &ServerDeps) -> MatchingResult<MatchRecord> {
    deps.match_records
        .find_match_record(id)
        .await?
        .ok_or_else(|| MatchingError::not_found("Match record", id))
}

/// Newest first; set filters combine with AND.
pub async fn list_match_records(filter: &MatchRecordFilter, deps: &ServerDeps) -> MatchingResult<Vec<MatchRecord>> {
    filter.validate()?;
    deps.match_records.list_match_records(filter).await
}

pub async fn get_match_analytics(deps: &ServerDeps) -> MatchingResult<MatchAnalytics> {
    deps.match_records.analytics().await
}
