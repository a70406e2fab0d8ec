//! Postgres implementations of the persistence traits.
//!
//! Thin adapters: the SQL lives on the models, these only route trait calls.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    BaseClientStore, BaseInventoryStore, BaseMatchRecordStore, BaseNeedStore, BaseOrderStore,
    BaseStrainFamilyResolver, BaseVendorSupplyStore, QuoteStamp, StrainFamily, StrainRef,
};
use crate::common::{
    BatchId, ClientId, ClientNeedId, MatchRecordId, OrderId, StrainId, UserId, VendorSupplyId,
};
use crate::domains::clients::Client;
use crate::domains::matching::models::{MatchRecord, MatchRecordFilter, NewMatchRecord, UserAction};
use crate::domains::needs::models::{ClientNeed, NeedFilter, NeedInsert, NewClientNeed};
use crate::domains::orders::models::{NewOrder, Order};
use crate::domains::supply::models::{InventoryBatch, VendorSupplyItem};
use crate::error::MatchingResult;

#[derive(Clone)]
pub struct PgStores {
    pool: PgPool,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseNeedStore for PgStores {
    async fn find_need(&self, id: ClientNeedId) -> MatchingResult<Option<ClientNeed>> {
        ClientNeed::find_by_id(id, &self.pool).await
    }

    async fn list_needs(&self, filter: &NeedFilter) -> MatchingResult<Vec<ClientNeed>> {
        ClientNeed::list(filter, &self.pool).await
    }

    async fn insert_need_unique(&self, need: NewClientNeed) -> MatchingResult<NeedInsert> {
        ClientNeed::insert_unique(need, &self.pool).await
    }

    async fn save_need(&self, need: &ClientNeed) -> MatchingResult<ClientNeed> {
        need.save(&self.pool).await
    }

    async fn expire_needs(&self, now: DateTime<Utc>) -> MatchingResult<u64> {
        ClientNeed::expire_older_than(now, &self.pool).await
    }
}

#[async_trait]
impl BaseInventoryStore for PgStores {
    async fn find_batch(&self, id: BatchId) -> MatchingResult<Option<InventoryBatch>> {
        InventoryBatch::find_by_id(id, &self.pool).await
    }

    async fn sellable_batches(&self) -> MatchingResult<Vec<InventoryBatch>> {
        InventoryBatch::find_sellable(&self.pool).await
    }
}

#[async_trait]
impl BaseVendorSupplyStore for PgStores {
    async fn find_vendor_supply(&self, id: VendorSupplyId) -> MatchingResult<Option<VendorSupplyItem>> {
        VendorSupplyItem::find_by_id(id, &self.pool).await
    }

    async fn available_vendor_supply(&self) -> MatchingResult<Vec<VendorSupplyItem>> {
        VendorSupplyItem::find_available(&self.pool).await
    }

    async fn expire_vendor_supply(&self, now: DateTime<Utc>) -> MatchingResult<u64> {
        VendorSupplyItem::expire_older_than(now, &self.pool).await
    }
}

#[async_trait]
impl BaseClientStore for PgStores {
    async fn find_client(&self, id: ClientId) -> MatchingResult<Option<Client>> {
        Client::find_by_id(id, &self.pool).await
    }

    async fn buyers(&self) -> MatchingResult<Vec<Client>> {
        Client::find_buyers(&self.pool).await
    }
}

#[async_trait]
impl BaseOrderStore for PgStores {
    async fn find_order(&self, id: OrderId) -> MatchingResult<Option<Order>> {
        Order::find_by_id(id, &self.pool).await
    }

    async fn insert_order(&self, order: NewOrder, stamp: Option<QuoteStamp>) -> MatchingResult<Order> {
        let mut tx = self.pool.begin().await?;
        let quote = Order::insert(order, &mut *tx).await?;
        if let Some(stamp) = stamp {
            MatchRecord::update_action(
                stamp.match_record_id,
                UserAction::CreatedQuote,
                Some(stamp.actor_id),
                &mut *tx,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(quote)
    }

    async fn convert_quote(
        &self,
        id: OrderId,
        sale_number: &str,
        match_record_id: Option<MatchRecordId>,
    ) -> MatchingResult<Order> {
        let mut tx = self.pool.begin().await?;
        let sale = Order::convert_to_sale(id, sale_number, &mut *tx).await?;
        if let Some(record_id) = match_record_id {
            MatchRecord::mark_converted_by_id(record_id, sale.id, &mut *tx).await?;
        }
        tx.commit().await?;
        Ok(sale)
    }

    async fn sales(&self, client_id: Option<ClientId>) -> MatchingResult<Vec<Order>> {
        Order::find_sales(client_id, &self.pool).await
    }
}

#[async_trait]
impl BaseMatchRecordStore for PgStores {
    async fn record(&self, record: NewMatchRecord) -> MatchingResult<MatchRecord> {
        MatchRecord::insert(record, &self.pool).await
    }

    async fn find_match_record(&self, id: MatchRecordId) -> MatchingResult<Option<MatchRecord>> {
        MatchRecord::find_by_id(id, &self.pool).await
    }

    async fn list_match_records(&self, filter: &MatchRecordFilter) -> MatchingResult<Vec<MatchRecord>> {
        MatchRecord::list(filter, &self.pool).await
    }

    async fn update_action(
        &self,
        id: MatchRecordId,
        action: UserAction,
        actor: Option<UserId>,
    ) -> MatchingResult<MatchRecord> {
        MatchRecord::update_action(id, action, actor, &self.pool).await
    }

    async fn mark_converted(&self, id: MatchRecordId, sale_order_id: OrderId) -> MatchingResult<MatchRecord> {
        MatchRecord::mark_converted_by_id(id, sale_order_id, &self.pool).await
    }
}

// =============================================================================
// Strain library
// =============================================================================

#[derive(sqlx::FromRow)]
struct StrainRow {
    id: StrainId,
    name: String,
    parent_strain_id: Option<StrainId>,
}

pub struct PgStrainLibrary {
    pool: PgPool,
}

impl PgStrainLibrary {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find(&self, id: StrainId) -> Result<Option<StrainRow>> {
        sqlx::query_as::<_, StrainRow>("SELECT id, name, parent_strain_id FROM strains WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load strain")
    }
}

#[async_trait]
impl BaseStrainFamilyResolver for PgStrainLibrary {
    async fn strain_family(&self, id: StrainId) -> Result<Option<StrainFamily>> {
        let Some(strain) = self.find(id).await? else {
            return Ok(None);
        };

        let parent = match strain.parent_strain_id {
            Some(parent_id) => self.find(parent_id).await?.map(|p| StrainRef {
                id: p.id,
                name: p.name,
            }),
            None => None,
        };

        let root_id = parent.as_ref().map_or(strain.id, |p| p.id);
        let variants = sqlx::query_as::<_, StrainRow>(
            "SELECT id, name, parent_strain_id FROM strains WHERE parent_strain_id = $1 ORDER BY id",
        )
        .bind(root_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load strain variants")?
        .into_iter()
        .map(|v| StrainRef { id: v.id, name: v.name })
        .collect();

        Ok(Some(StrainFamily {
            strain: StrainRef {
                id: strain.id,
                name: strain.name,
            },
            parent,
            variants,
        }))
    }
}
