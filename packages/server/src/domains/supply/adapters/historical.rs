//! Historical buyers: clients whose sales repeatedly match a product
//! signature, whether or not they have a need on file.

use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

use crate::common::ClientId;
use crate::domains::clients::{Client, ClientSummary};
use crate::domains::matching::types::{sort_by_confidence, HistoricalBuyer, Match, MatchType, SupplySignature, SupplySource};
use crate::domains::matching::utils::{score_pattern, Score};
use crate::domains::supply::models::{aggregate_patterns, lapsed_buyers, LapsedBuyer, PurchasePattern};
use crate::error::{MatchingError, MatchingResult};
use crate::kernel::ServerDeps;

/// A buyer pattern that cleared the historical threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalCandidate {
    pub buyer: HistoricalBuyer,
    pub score: Score,
}

impl HistoricalCandidate {
    pub fn client_id(&self) -> ClientId {
        self.buyer.client.id
    }

    pub fn into_match(self) -> Match {
        Match::new(
            MatchType::Historical,
            self.score.confidence,
            self.score.reasons,
            SupplySource::Historical(self.buyer),
            None,
        )
    }
}

/// Scores every buyer pattern against `signature`, highest confidence first.
///
/// With `client_id` only that client's history is considered.
pub async fn find_historical_buyers(
    signature: &SupplySignature,
    client_id: Option<ClientId>,
    deps: &ServerDeps,
) -> MatchingResult<Vec<HistoricalCandidate>> {
    let clients: Vec<Client> = match client_id {
        Some(id) => deps.clients.find_client(id).await?.into_iter().collect(),
        None => deps.clients.buyers().await?,
    };
    if clients.is_empty() {
        return Ok(Vec::new());
    }
    let clients: HashMap<ClientId, &Client> = clients.iter().map(|c| (c.id, c)).collect();

    let sales = deps.orders.sales(client_id).await?;
    let lapsed_after = deps.matching.lapsed_buyer_days;
    let patterns = aggregate_patterns(&sales, deps.matching.historical_min_purchases, Utc::now());

    let mut found: Vec<(usize, HistoricalCandidate)> = patterns
        .into_iter()
        .filter_map(|pattern| {
            let client = clients.get(&pattern.client_id)?;
            let score = score_pattern(signature, &pattern, lapsed_after)?;
            Some(HistoricalCandidate {
                buyer: HistoricalBuyer {
                    client: ClientSummary::from(*client),
                    is_lapsed_buyer: pattern.days_since_last_purchase > lapsed_after,
                    pattern,
                },
                score,
            })
        })
        .enumerate()
        .collect();

    sort_by_confidence(&mut found, |c| c.score.confidence);
    debug!(count = found.len(), "Historical buyers scored");

    Ok(found.into_iter().map(|(_, c)| c).collect())
}

/// Clients whose latest sale is at least `threshold_days` old, most lapsed
/// first. Defaults to the configured lapse threshold.
pub async fn find_lapsed_buyers(threshold_days: Option<i64>, deps: &ServerDeps) -> MatchingResult<Vec<LapsedBuyer>> {
    let threshold = threshold_days.unwrap_or(deps.matching.lapsed_buyer_days);
    let sales = deps.orders.sales(None).await?;
    Ok(lapsed_buyers(&sales, threshold, Utc::now()))
}

/// One client's repeat-purchase patterns, most frequent first.
pub async fn client_purchase_patterns(
    client_id: ClientId,
    min_purchases: Option<u32>,
    deps: &ServerDeps,
) -> MatchingResult<Vec<PurchasePattern>> {
    deps.clients
        .find_client(client_id)
        .await?
        .ok_or_else(|| MatchingError::not_found("Client", client_id))?;

    let sales = deps.orders.sales(Some(client_id)).await?;
    let min_purchases = min_purchases.unwrap_or(deps.matching.historical_min_purchases);
    Ok(aggregate_patterns(&sales, min_purchases, Utc::now()))
}
