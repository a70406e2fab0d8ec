use futures::future;
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use tracing::{debug, info, instrument};

use super::recording::record_match;
use crate::common::ClientNeedId;
use crate::domains::matching::types::{
    sort_by_confidence, Match, MatchType, NeedMatches, SupplySignature, SupplySource, MIN_CONFIDENCE,
};
use crate::domains::needs::actions::get_need;
use crate::domains::needs::models::ClientNeed;
use crate::domains::supply::adapters::{find_historical_buyers, inventory, vendor};
use crate::error::MatchingResult;
use crate::kernel::ServerDeps;

/// Finds supply for one need: inventory, vendor offers and the client's own
/// buying history. Every surviving match is recorded before returning.
#[instrument(skip(deps), fields(need_id = %need_id))]
pub async fn find_matches_for_need(need_id: ClientNeedId, deps: &ServerDeps) -> MatchingResult<NeedMatches> {
    let need = get_need(need_id, deps).await?;
    let matches = match_need(&need, deps).await?;

    info!(client_id = %need.client_id, matches = matches.len(), "Forward matching complete");

    Ok(NeedMatches {
        need_id: need.id,
        client_id: need.client_id,
        matches,
    })
}

/// Forward-matches an already loaded need.
pub async fn match_need(need: &ClientNeed, deps: &ServerDeps) -> MatchingResult<Vec<Match>> {
    let (batches, offers) = tokio::try_join!(
        inventory::sellable_batches(deps),
        vendor::available_supply(deps)
    )?;

    let sources: Vec<SupplySource> = batches
        .into_iter()
        .map(SupplySource::Inventory)
        .chain(offers.into_iter().map(SupplySource::Vendor))
        .collect();
    let explicit_count = sources.len();
    debug!(candidates = explicit_count, "Scoring supply candidates");

    let scorer = deps.scorer();
    let scorer = &scorer;

    let mut scored: Vec<(usize, Match)> = stream::iter(sources.into_iter().enumerate())
        .map(|(index, source)| async move {
            let price = match &source {
                SupplySource::Inventory(batch) => inventory::client_price(batch, need.client_id, deps).await,
                SupplySource::Vendor(item) => item.unit_price,
                SupplySource::Historical(_) => None,
            };

            let score = scorer.score(need, &source.candidate(price)).await;
            if score.confidence < MIN_CONFIDENCE {
                return None;
            }

            let mut matched = Match::new(
                MatchType::classify(score.confidence),
                score.confidence,
                score.reasons,
                source,
                price,
            );
            matched.match_record_id = record_match(need.client_id, Some(need.id), &matched, None, deps).await;
            Some((index, matched))
        })
        .buffer_unordered(deps.concurrency())
        .filter_map(future::ready)
        .collect()
        .await;

    // The client's own history, scored on the need's signature.
    let signature = SupplySignature::from(need);
    let historical = find_historical_buyers(&signature, Some(need.client_id), deps).await?;
    for (offset, candidate) in historical.into_iter().enumerate() {
        let mut matched = candidate.into_match();
        matched.match_record_id = record_match(need.client_id, Some(need.id), &matched, None, deps).await;
        scored.push((explicit_count + offset, matched));
    }

    sort_by_confidence(&mut scored, |m| m.confidence);
    Ok(scored.into_iter().map(|(_, m)| m).collect())
}

/// Forward-matches every ACTIVE need. Most matches first, then highest top
/// confidence.
#[instrument(skip(deps))]
pub async fn get_all_active_needs_with_matches(deps: &ServerDeps) -> MatchingResult<Vec<NeedMatches>> {
    let needs = deps.needs.active_needs().await?;

    // Sequential: each match_need already fans out over the supply.
    let mut results = Vec::with_capacity(needs.len());
    for need in needs {
        let matches = match_need(&need, deps).await?;
        results.push(NeedMatches {
            need_id: need.id,
            client_id: need.client_id,
            matches,
        });
    }
    results.sort_by(compare_by_matches);
    Ok(results)
}

/// Match count desc, then top confidence desc.
pub(super) fn compare_by_matches(a: &NeedMatches, b: &NeedMatches) -> Ordering {
    b.matches
        .len()
        .cmp(&a.matches.len())
        .then_with(|| b.top_confidence().total_cmp(&a.top_confidence()))
}
