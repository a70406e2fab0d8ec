use futures::future;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{error, info, instrument};

use super::recording::record_match;
use crate::common::{BatchId, VendorSupplyId};
use crate::domains::matching::types::{
    sort_by_confidence, Match, MatchResult, MatchType, SupplySource, MIN_CONFIDENCE,
};
use crate::domains::supply::adapters::{find_historical_buyers, inventory, vendor};
use crate::error::MatchingResult;
use crate::kernel::ServerDeps;

/// Buyers for an inventory batch: every ACTIVE need scored against it, then
/// historical buyers with no matching need on file.
#[instrument(skip(deps), fields(batch_id = %batch_id))]
pub async fn find_buyers_for_inventory(batch_id: BatchId, deps: &ServerDeps) -> MatchingResult<Vec<MatchResult>> {
    let batch = inventory::get_batch(batch_id, deps).await?;
    reverse_match(SupplySource::Inventory(batch), deps).await
}

/// Buyers for a vendor offer. Same traversal as for inventory.
#[instrument(skip(deps), fields(vendor_supply_id = %supply_id))]
pub async fn find_buyers_for_vendor_supply(
    supply_id: VendorSupplyId,
    deps: &ServerDeps,
) -> MatchingResult<Vec<MatchResult>> {
    let item = vendor::get_vendor_supply(supply_id, deps).await?;
    reverse_match(SupplySource::Vendor(item), deps).await
}

/// Opportunistic variant of `find_buyers_for_inventory`: any failure is
/// logged and yields no matches.
pub async fn find_client_needs_for_batch(batch_id: BatchId, deps: &ServerDeps) -> Vec<MatchResult> {
    find_buyers_for_inventory(batch_id, deps)
        .await
        .unwrap_or_else(|e| {
            error!(batch_id = %batch_id, error = %e, "Reverse matching for batch failed");
            Vec::new()
        })
}

/// Opportunistic variant of `find_buyers_for_vendor_supply`.
pub async fn find_client_needs_for_vendor_supply(supply_id: VendorSupplyId, deps: &ServerDeps) -> Vec<MatchResult> {
    find_buyers_for_vendor_supply(supply_id, deps)
        .await
        .unwrap_or_else(|e| {
            error!(vendor_supply_id = %supply_id, error = %e, "Reverse matching for vendor supply failed");
            Vec::new()
        })
}

/// One entry per client, highest confidence first. Every explicit match
/// above the threshold is recorded, including a client's weaker needs.
async fn reverse_match(supply: SupplySource, deps: &ServerDeps) -> MatchingResult<Vec<MatchResult>> {
    let needs = deps.needs.active_needs().await?;
    let explicit_count = needs.len();

    let scorer = deps.scorer();
    let scorer = &scorer;
    let supply = &supply;

    let mut explicit: Vec<(usize, MatchResult)> = stream::iter(needs.into_iter().enumerate())
        .map(|(index, need)| async move {
            let price = match supply {
                SupplySource::Inventory(batch) => inventory::client_price(batch, need.client_id, deps).await,
                SupplySource::Vendor(item) => item.unit_price,
                SupplySource::Historical(_) => None,
            };

            let score = scorer.score(&need, &supply.candidate(price)).await;
            if score.confidence < MIN_CONFIDENCE {
                return None;
            }

            let mut matched = Match::new(
                MatchType::classify(score.confidence),
                score.confidence,
                score.reasons,
                supply.clone(),
                price,
            );
            matched.match_record_id = record_match(need.client_id, Some(need.id), &matched, None, deps).await;

            Some((
                index,
                MatchResult {
                    client_id: need.client_id,
                    need_id: Some(need.id),
                    matches: vec![matched],
                },
            ))
        })
        .buffer_unordered(deps.concurrency())
        .filter_map(future::ready)
        .collect()
        .await;

    sort_by_confidence(&mut explicit, MatchResult::top_confidence);

    let mut seen = HashSet::new();
    let mut results: Vec<(usize, MatchResult)> = explicit
        .into_iter()
        .filter(|(_, result)| seen.insert(result.client_id))
        .collect();

    // Buyers with history but no explicit need, scored on the supply's own
    // signature.
    let historical = find_historical_buyers(&supply.signature(), None, deps).await?;
    for (offset, candidate) in historical.into_iter().enumerate() {
        let client_id = candidate.client_id();
        if !seen.insert(client_id) {
            continue;
        }

        let mut matched = candidate.into_match();
        matched.available_quantity = supply.available_quantity();
        matched.match_record_id = record_match(client_id, None, &matched, Some(supply), deps).await;

        results.push((
            explicit_count + offset,
            MatchResult {
                client_id,
                need_id: None,
                matches: vec![matched],
            },
        ));
    }

    sort_by_confidence(&mut results, MatchResult::top_confidence);
    info!(
        source_kind = ?supply.kind(),
        source_id = supply.source_id(),
        buyers = results.len(),
        "Reverse matching complete"
    );

    Ok(results.into_iter().map(|(_, r)| r).collect())
}
