use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domains::matching::actions::find_matches_for_need;
use crate::domains::needs::models::{ClientNeed, NeedFilter};
use crate::error::MatchingResult;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedWithMatchCount {
    #[serde(flatten)]
    pub need: ClientNeed,
    pub match_count: usize,
}

/// Lists needs with a live match count. Only ACTIVE needs are matched; a
/// need whose matching fails is logged and reported with zero matches.
/// Needs are walked one at a time so the only fan-out is the supply fan-out
/// inside each match.
pub async fn list_needs_with_match_counts(
    filter: &NeedFilter,
    deps: &ServerDeps,
) -> MatchingResult<Vec<NeedWithMatchCount>> {
    let needs = deps.needs.list_needs(filter).await?;

    let mut counted = Vec::with_capacity(needs.len());
    for need in needs {
        let match_count = if need.is_active() {
            match find_matches_for_need(need.id, deps).await {
                Ok(result) => result.matches.len(),
                Err(e) => {
                    warn!(need_id = %need.id, error = %e, "Failed to find matches for need");
                    0
                }
            }
        } else {
            0
        };
        counted.push(NeedWithMatchCount { need, match_count });
    }

    Ok(counted)
}
