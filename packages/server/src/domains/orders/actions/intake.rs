use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domains::matching::actions::match_need;
use crate::domains::matching::types::Match;
use crate::domains::needs::actions::create_need;
use crate::domains::needs::models::{ClientNeed, NewClientNeed};
use crate::error::MatchingResult;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedWithMatches {
    pub need: ClientNeed,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub matches: Vec<Match>,
}

/// Create a need and immediately forward-match it. A duplicate submission
/// returns the existing need, matched afresh.
#[instrument(skip(input, deps), fields(client_id = %input.client_id))]
pub async fn create_need_and_find_matches(input: NewClientNeed, deps: &ServerDeps) -> MatchingResult<NeedWithMatches> {
    let created = create_need(input, deps).await?;
    let matches = match_need(&created.need, deps).await?;

    Ok(NeedWithMatches {
        need: created.need,
        is_duplicate: created.is_duplicate,
        message: created.message,
        matches,
    })
}
