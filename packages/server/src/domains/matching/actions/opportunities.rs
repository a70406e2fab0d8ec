use tracing::instrument;

use super::forward::{compare_by_matches, match_need};
use crate::domains::matching::types::{NeedMatches, Opportunity};
use crate::domains::needs::models::ClientNeed;
use crate::error::MatchingResult;
use crate::kernel::ServerDeps;

pub const DEFAULT_OPPORTUNITY_LIMIT: usize = 5;

/// Top `limit` ACTIVE needs that have supply waiting, ranked by match count
/// then top confidence, with the client's name and the need's metadata.
#[instrument(skip(deps))]
pub async fn get_smart_opportunities(limit: usize, deps: &ServerDeps) -> MatchingResult<Vec<Opportunity>> {
    let needs = deps.needs.active_needs().await?;

    let mut ranked: Vec<(ClientNeed, NeedMatches)> = Vec::with_capacity(needs.len());
    for need in needs {
        let matches = match_need(&need, deps).await?;
        let result = NeedMatches {
            need_id: need.id,
            client_id: need.client_id,
            matches,
        };
        ranked.push((need, result));
    }
    ranked.retain(|(_, result)| !result.matches.is_empty());
    ranked.sort_by(|(_, a), (_, b)| compare_by_matches(a, b));
    ranked.truncate(limit);

    let mut opportunities = Vec::with_capacity(ranked.len());
    for (need, result) in ranked {
        let client_name = deps
            .clients
            .find_client(need.client_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_else(|| format!("Client #{}", need.client_id));

        opportunities.push(Opportunity {
            need_id: need.id,
            client_id: need.client_id,
            client_name,
            priority: need.priority,
            potential_revenue: need.potential_revenue(),
            notes: need.notes,
            strain: need.strain,
            category: need.category,
            match_count: result.matches.len(),
            top_confidence: result.top_confidence(),
            best_match: result.matches.into_iter().next(),
        });
    }

    Ok(opportunities)
}
