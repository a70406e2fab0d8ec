// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Scoring, orchestration and workflows are domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseNeedStore, BasePricingService)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{
    BatchId, ClientId, ClientNeedId, MatchRecordId, OrderId, StrainId, UserId, VendorSupplyId,
};
use crate::domains::clients::Client;
use crate::domains::matching::models::{
    MatchAnalytics, MatchRecord, MatchRecordFilter, NewMatchRecord, UserAction,
};
use crate::domains::needs::models::{ClientNeed, NeedFilter, NeedInsert, NewClientNeed};
use crate::domains::orders::models::{NewOrder, Order};
use crate::domains::supply::models::{InventoryBatch, VendorSupplyItem};
use crate::error::MatchingResult;

// =============================================================================
// Persistence Traits
// =============================================================================

#[async_trait]
pub trait BaseNeedStore: Send + Sync {
    async fn find_need(&self, id: ClientNeedId) -> MatchingResult<Option<ClientNeed>>;

    async fn list_needs(&self, filter: &NeedFilter) -> MatchingResult<Vec<ClientNeed>>;

    async fn active_needs(&self) -> MatchingResult<Vec<ClientNeed>> {
        self.list_needs(&NeedFilter::active()).await
    }

    /// Inserts unless an ACTIVE need with the same signature exists for the
    /// client. Implementations must make the check and the insert atomic.
    async fn insert_need_unique(&self, need: NewClientNeed) -> MatchingResult<NeedInsert>;

    /// Persists every mutable field of an existing need.
    async fn save_need(&self, need: &ClientNeed) -> MatchingResult<ClientNeed>;

    /// Marks ACTIVE needs with `expires_at < now` as EXPIRED.
    async fn expire_needs(&self, now: DateTime<Utc>) -> MatchingResult<u64>;
}

#[async_trait]
pub trait BaseInventoryStore: Send + Sync {
    async fn find_batch(&self, id: BatchId) -> MatchingResult<Option<InventoryBatch>>;

    /// LIVE batches with stock on hand.
    async fn sellable_batches(&self) -> MatchingResult<Vec<InventoryBatch>>;
}

#[async_trait]
pub trait BaseVendorSupplyStore: Send + Sync {
    async fn find_vendor_supply(&self, id: VendorSupplyId) -> MatchingResult<Option<VendorSupplyItem>>;

    async fn available_vendor_supply(&self) -> MatchingResult<Vec<VendorSupplyItem>>;

    /// Marks AVAILABLE offers past `available_until` as EXPIRED.
    async fn expire_vendor_supply(&self, now: DateTime<Utc>) -> MatchingResult<u64>;
}

#[async_trait]
pub trait BaseClientStore: Send + Sync {
    async fn find_client(&self, id: ClientId) -> MatchingResult<Option<Client>>;

    async fn buyers(&self) -> MatchingResult<Vec<Client>>;
}

/// The match record an order write stamps, committed with the order or not
/// at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteStamp {
    pub match_record_id: MatchRecordId,
    pub actor_id: UserId,
}

#[async_trait]
pub trait BaseOrderStore: Send + Sync {
    async fn find_order(&self, id: OrderId) -> MatchingResult<Option<Order>>;

    /// Inserts the order and, when given, sets the record to CREATED_QUOTE in
    /// the same transaction. NotFound for an unknown record.
    async fn insert_order(&self, order: NewOrder, stamp: Option<QuoteStamp>) -> MatchingResult<Order>;

    /// Flips a quote to a sale under a new number and, when given, marks the
    /// record `resulted_in_sale` in the same transaction. Validation error if
    /// the row is not a quote at write time.
    async fn convert_quote(
        &self,
        id: OrderId,
        sale_number: &str,
        match_record_id: Option<MatchRecordId>,
    ) -> MatchingResult<Order>;

    async fn sales(&self, client_id: Option<ClientId>) -> MatchingResult<Vec<Order>>;
}

#[async_trait]
pub trait BaseMatchRecordStore: Send + Sync {
    /// Append-only; no dedup.
    async fn record(&self, record: NewMatchRecord) -> MatchingResult<MatchRecord>;

    async fn find_match_record(&self, id: MatchRecordId) -> MatchingResult<Option<MatchRecord>>;

    async fn list_match_records(&self, filter: &MatchRecordFilter) -> MatchingResult<Vec<MatchRecord>>;

    async fn update_action(
        &self,
        id: MatchRecordId,
        action: UserAction,
        actor: Option<UserId>,
    ) -> MatchingResult<MatchRecord>;

    async fn mark_converted(&self, id: MatchRecordId, sale_order_id: OrderId) -> MatchingResult<MatchRecord>;

    async fn analytics(&self) -> MatchingResult<MatchAnalytics> {
        let records = self.list_match_records(&MatchRecordFilter::default()).await?;
        Ok(MatchAnalytics::from_records(&records))
    }
}

// =============================================================================
// Strain Library Trait
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrainRef {
    pub id: StrainId,
    pub name: String,
}

/// A strain with its parent (if it is a variant) and its named variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrainFamily {
    pub strain: StrainRef,
    pub parent: Option<StrainRef>,
    pub variants: Vec<StrainRef>,
}

impl StrainFamily {
    /// The parent, or the strain itself when it has none.
    pub fn root(&self) -> &StrainRef {
        self.parent.as_ref().unwrap_or(&self.strain)
    }
}

#[async_trait]
pub trait BaseStrainFamilyResolver: Send + Sync {
    /// `None` when the strain id is unknown to the library.
    async fn strain_family(&self, id: StrainId) -> Result<Option<StrainFamily>>;
}

// =============================================================================
// Pricing Trait
// =============================================================================

/// Item attributes pricing rules can condition on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingSubject {
    pub base_price: f64,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub strain: Option<String>,
    pub grade: Option<String>,
}

#[async_trait]
pub trait BasePricingService: Send + Sync {
    /// Client-specific unit price for an item with a known base price.
    async fn price_for_client(&self, client_id: ClientId, item: &PricingSubject) -> Result<f64>;
}
