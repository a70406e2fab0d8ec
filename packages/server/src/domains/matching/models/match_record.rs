use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool};
use std::collections::HashMap;

use crate::common::{
    BatchId, ClientId, ClientNeedId, MatchRecordId, OrderId, UserId, VendorSupplyId,
};
use crate::domains::matching::types::{Match, MatchType, SourceKind, SupplySource};
use crate::error::{MatchingError, MatchingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "match_user_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserAction {
    CreatedQuote,
    ContactedVendor,
    Dismissed,
    #[default]
    #[sqlx(rename = "NONE")]
    #[serde(rename = "NONE")]
    NoAction,
}

/// Durable audit entry for a computed match. Never deleted.
#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchRecordId,
    pub client_need_id: Option<ClientNeedId>,
    pub client_id: ClientId,
    pub inventory_batch_id: Option<BatchId>,
    pub vendor_supply_id: Option<VendorSupplyId>,
    pub match_type: MatchType,
    pub source_kind: SourceKind,
    pub confidence_score: Decimal,
    pub match_reasons: Json<Vec<String>>,
    pub user_action: UserAction,
    pub action_by: Option<UserId>,
    pub action_at: Option<DateTime<Utc>>,
    pub resulted_in_sale: bool,
    pub sale_order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMatchRecord {
    pub client_need_id: Option<ClientNeedId>,
    pub client_id: ClientId,
    pub inventory_batch_id: Option<BatchId>,
    pub vendor_supply_id: Option<VendorSupplyId>,
    pub match_type: MatchType,
    pub source_kind: SourceKind,
    pub confidence_score: Decimal,
    pub match_reasons: Vec<String>,
}

impl NewMatchRecord {
    /// Record for a match surfaced for `client_id`. `supply` names the
    /// inventory or vendor item when the match is not itself that item
    /// (reverse historical discovery).
    pub fn for_match(
        client_id: ClientId,
        client_need_id: Option<ClientNeedId>,
        matched: &Match,
        supply: Option<&SupplySource>,
    ) -> Self {
        let (inventory_batch_id, vendor_supply_id) = match supply.unwrap_or(&matched.source) {
            SupplySource::Inventory(batch) => (Some(batch.id), None),
            SupplySource::Vendor(item) => (None, Some(item.id)),
            SupplySource::Historical(_) => (None, None),
        };

        Self {
            client_need_id,
            client_id,
            inventory_batch_id,
            vendor_supply_id,
            match_type: matched.match_type,
            source_kind: matched.source_kind,
            confidence_score: confidence_decimal(matched.confidence),
            match_reasons: matched.reasons.clone(),
        }
    }

    pub fn into_record(self, id: MatchRecordId, now: DateTime<Utc>) -> MatchRecord {
        MatchRecord {
            id,
            client_need_id: self.client_need_id,
            client_id: self.client_id,
            inventory_batch_id: self.inventory_batch_id,
            vendor_supply_id: self.vendor_supply_id,
            match_type: self.match_type,
            source_kind: self.source_kind,
            confidence_score: self.confidence_score,
            match_reasons: Json(self.match_reasons),
            user_action: UserAction::NoAction,
            action_by: None,
            action_at: None,
            resulted_in_sale: false,
            sale_order_id: None,
            created_at: now,
        }
    }
}

/// Confidence stored as `NUMERIC(5,2)`.
pub fn confidence_decimal(confidence: f64) -> Decimal {
    Decimal::from_f64(confidence)
        .unwrap_or_default()
        .round_dp(2)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchRecordFilter {
    pub client_id: Option<ClientId>,
    pub client_need_id: Option<ClientNeedId>,
    pub match_type: Option<MatchType>,
    pub user_action: Option<UserAction>,
    pub limit: Option<i64>,
}

impl MatchRecordFilter {
    pub fn validate(&self) -> MatchingResult<()> {
        match self.limit {
            Some(limit) if limit < 0 => Err(MatchingError::validation("Limit cannot be negative")),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, record: &MatchRecord) -> bool {
        self.client_id.map_or(true, |c| record.client_id == c)
            && self
                .client_need_id
                .map_or(true, |n| record.client_need_id == Some(n))
            && self.match_type.map_or(true, |t| record.match_type == t)
            && self.user_action.map_or(true, |a| record.user_action == a)
    }
}

impl MatchRecord {
    pub fn confidence(&self) -> f64 {
        self.confidence_score.to_f64().unwrap_or(0.0)
    }

    /// Sets the action. Re-applying the same action only refreshes the stamp.
    pub fn apply_action(&mut self, action: UserAction, actor: Option<UserId>, now: DateTime<Utc>) {
        self.user_action = action;
        self.action_by = actor;
        self.action_at = Some(now);
    }

    pub fn mark_converted(&mut self, sale_order_id: OrderId) {
        self.resulted_in_sale = true;
        self.sale_order_id = Some(sale_order_id);
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub async fn insert(new: NewMatchRecord, pool: &PgPool) -> MatchingResult<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO match_records (
                client_need_id, client_id, inventory_batch_id, vendor_supply_id,
                match_type, source_kind, confidence_score, match_reasons
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(new.client_need_id)
        .bind(new.client_id)
        .bind(new.inventory_batch_id)
        .bind(new.vendor_supply_id)
        .bind(new.match_type)
        .bind(new.source_kind)
        .bind(new.confidence_score)
        .bind(Json(&new.match_reasons))
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: MatchRecordId, pool: &PgPool) -> MatchingResult<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM match_records WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list(filter: &MatchRecordFilter, pool: &PgPool) -> MatchingResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM match_records
             WHERE ($1::BIGINT IS NULL OR client_id = $1)
               AND ($2::BIGINT IS NULL OR client_need_id = $2)
               AND ($3::match_type IS NULL OR match_type = $3)
               AND ($4::match_user_action IS NULL OR user_action = $4)
             ORDER BY created_at DESC, id DESC
             LIMIT $5",
        )
        .bind(filter.client_id)
        .bind(filter.client_need_id)
        .bind(filter.match_type)
        .bind(filter.user_action)
        .bind(filter.limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update_action(
        id: MatchRecordId,
        action: UserAction,
        actor: Option<UserId>,
        executor: impl PgExecutor<'_>,
    ) -> MatchingResult<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE match_records
             SET user_action = $2, action_by = $3, action_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(action)
        .bind(actor)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| MatchingError::not_found("Match record", id))
    }

    pub async fn mark_converted_by_id(
        id: MatchRecordId,
        sale_order_id: OrderId,
        executor: impl PgExecutor<'_>,
    ) -> MatchingResult<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE match_records
             SET resulted_in_sale = TRUE, sale_order_id = $2
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(sale_order_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| MatchingError::not_found("Match record", id))
    }
}

// ============================================================================
// Analytics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTypeStats {
    pub match_type: MatchType,
    pub count: usize,
    pub converted: usize,
    pub conversion_rate: f64,
    pub average_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MatchAnalytics {
    pub total_matches: usize,
    pub actioned_matches: usize,
    pub converted_matches: usize,
    pub dismissed_matches: usize,
    pub action_rate: f64,
    pub conversion_rate: f64,
    pub average_confidence: f64,
    pub by_type: Vec<MatchTypeStats>,
    pub by_action: HashMap<UserAction, usize>,
    pub top_match_type: Option<MatchType>,
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl MatchAnalytics {
    pub fn from_records(records: &[MatchRecord]) -> Self {
        let total = records.len();
        if total == 0 {
            return Self::default();
        }

        let mut by_action: HashMap<UserAction, usize> = HashMap::new();
        let mut per_type: HashMap<MatchType, (usize, usize, f64)> = HashMap::new();
        let mut confidence_sum = 0.0;
        let mut converted = 0;

        for record in records {
            *by_action.entry(record.user_action).or_default() += 1;
            let entry = per_type.entry(record.match_type).or_default();
            entry.0 += 1;
            entry.2 += record.confidence();
            if record.resulted_in_sale {
                entry.1 += 1;
                converted += 1;
            }
            confidence_sum += record.confidence();
        }

        let mut by_type: Vec<MatchTypeStats> = per_type
            .into_iter()
            .map(|(match_type, (count, converted, confidence))| MatchTypeStats {
                match_type,
                count,
                converted,
                conversion_rate: percent(converted, count),
                average_confidence: confidence / count as f64,
            })
            .collect();

        // Best conversion first, then volume, then EXACT > CLOSE > HISTORICAL.
        by_type.sort_by(|a, b| {
            b.conversion_rate
                .total_cmp(&a.conversion_rate)
                .then(b.count.cmp(&a.count))
                .then(a.match_type.rank().cmp(&b.match_type.rank()))
        });

        let no_action = by_action.get(&UserAction::NoAction).copied().unwrap_or(0);
        let dismissed = by_action.get(&UserAction::Dismissed).copied().unwrap_or(0);
        let actioned = total - no_action;

        Self {
            total_matches: total,
            actioned_matches: actioned,
            converted_matches: converted,
            dismissed_matches: dismissed,
            action_rate: percent(actioned, total),
            conversion_rate: percent(converted, total),
            average_confidence: confidence_sum / total as f64,
            top_match_type: by_type.first().map(|s| s.match_type),
            by_type,
            by_action,
        }
    }
}
