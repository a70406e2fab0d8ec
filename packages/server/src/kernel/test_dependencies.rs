// TestDependencies - in-memory implementations for testing
//
// Provides memory-backed stores and mock collaborators that can be injected
// into ServerDeps for tests that don't need a database.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::pricing::{apply_pricing_rules, PricingRule};
use super::{
    BaseClientStore, BaseInventoryStore, BaseMatchRecordStore, BaseNeedStore, BaseOrderStore,
    BasePricingService, BaseStrainFamilyResolver, BaseVendorSupplyStore, PricingSubject,
    QuoteStamp, ServerDeps, StrainFamily, StrainFamilyCache, StrainRef,
};
use crate::common::{
    BatchId, ClientId, ClientNeedId, MatchRecordId, OrderId, StrainId, UserId, VendorSupplyId,
};
use crate::config::MatchingConfig;
use crate::domains::clients::Client;
use crate::domains::matching::models::{MatchRecord, MatchRecordFilter, NewMatchRecord, UserAction};
use crate::domains::needs::models::{ClientNeed, NeedFilter, NeedInsert, NewClientNeed};
use crate::domains::orders::models::{NewOrder, Order, OrderType};
use crate::domains::supply::models::{InventoryBatch, VendorSupplyItem, VendorSupplyStatus};
use crate::error::{MatchingError, MatchingResult};

// =============================================================================
// In-memory ledger (implements every store trait)
// =============================================================================

#[derive(Default)]
struct LedgerState {
    next_id: i64,
    clients: BTreeMap<ClientId, Client>,
    needs: BTreeMap<ClientNeedId, ClientNeed>,
    batches: BTreeMap<BatchId, InventoryBatch>,
    vendor_supply: BTreeMap<VendorSupplyId, VendorSupplyItem>,
    orders: BTreeMap<OrderId, Order>,
    match_records: BTreeMap<MatchRecordId, MatchRecord>,
}

impl LedgerState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    unavailable: AtomicBool,
    fail_record_writes: AtomicBool,
    fail_record_updates: AtomicBool,
    record_write_attempts: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> MatchingResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(MatchingError::Unavailable("in-memory ledger is offline".into()))
        } else {
            Ok(())
        }
    }

    /// Every store call fails with `Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Match-record inserts fail while set; everything else keeps working.
    pub fn fail_match_record_writes(&self, fail: bool) {
        self.fail_record_writes.store(fail, Ordering::SeqCst);
    }

    /// Match-record action and conversion stamps fail while set, including
    /// the ones written together with an order.
    pub fn fail_match_record_updates(&self, fail: bool) {
        self.fail_record_updates.store(fail, Ordering::SeqCst);
    }

    fn check_record_updates(&self) -> MatchingResult<()> {
        if self.fail_record_updates.load(Ordering::SeqCst) {
            Err(MatchingError::Unavailable("match_records update rejected".into()))
        } else {
            Ok(())
        }
    }

    pub fn record_write_attempts(&self) -> usize {
        self.record_write_attempts.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    pub fn add_client(&self, name: &str) -> ClientId {
        let mut state = self.state();
        let id = ClientId::from_raw(state.next_id());
        state.clients.insert(
            id,
            Client {
                id,
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
                phone: None,
                is_buyer: true,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Inserts without the duplicate check.
    pub fn add_need(&self, need: NewClientNeed) -> ClientNeed {
        let mut state = self.state();
        let id = ClientNeedId::from_raw(state.next_id());
        let need = need.into_need(id, Utc::now());
        state.needs.insert(id, need.clone());
        need
    }

    pub fn add_batch(&self, mut batch: InventoryBatch) -> BatchId {
        let mut state = self.state();
        batch.id = BatchId::from_raw(state.next_id());
        let id = batch.id;
        state.batches.insert(id, batch);
        id
    }

    pub fn add_vendor_supply(&self, mut item: VendorSupplyItem) -> VendorSupplyId {
        let mut state = self.state();
        item.id = VendorSupplyId::from_raw(state.next_id());
        let id = item.id;
        state.vendor_supply.insert(id, item);
        id
    }

    /// Stores an order as-is, created at `created_at`.
    pub fn add_order(&self, order: NewOrder, created_at: DateTime<Utc>) -> OrderId {
        let mut state = self.state();
        let id = OrderId::from_raw(state.next_id());
        state.orders.insert(id, order.into_order(id, created_at));
        id
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn needs(&self) -> Vec<ClientNeed> {
        self.state().needs.values().cloned().collect()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.state().orders.values().cloned().collect()
    }

    pub fn match_records(&self) -> Vec<MatchRecord> {
        self.state().match_records.values().cloned().collect()
    }

    pub fn vendor_supply(&self) -> Vec<VendorSupplyItem> {
        self.state().vendor_supply.values().cloned().collect()
    }
}

#[async_trait]
impl BaseNeedStore for InMemoryLedger {
    async fn find_need(&self, id: ClientNeedId) -> MatchingResult<Option<ClientNeed>> {
        self.check_available()?;
        Ok(self
            .state()
            .needs
            .get(&id)
            .filter(|n| n.deleted_at.is_none())
            .cloned())
    }

    async fn list_needs(&self, filter: &NeedFilter) -> MatchingResult<Vec<ClientNeed>> {
        self.check_available()?;
        let mut needs: Vec<ClientNeed> = self
            .state()
            .needs
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        needs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(needs)
    }

    async fn insert_need_unique(&self, need: NewClientNeed) -> MatchingResult<NeedInsert> {
        self.check_available()?;
        let signature = need.signature();

        // Check and insert under one lock.
        let mut state = self.state();
        if let Some(existing) = state
            .needs
            .values()
            .find(|n| n.is_active() && n.signature() == signature)
        {
            return Ok(NeedInsert::Duplicate(existing.clone()));
        }

        let id = ClientNeedId::from_raw(state.next_id());
        let created = need.into_need(id, Utc::now());
        state.needs.insert(id, created.clone());
        Ok(NeedInsert::Created(created))
    }

    async fn save_need(&self, need: &ClientNeed) -> MatchingResult<ClientNeed> {
        self.check_available()?;
        let mut state = self.state();
        if !state.needs.contains_key(&need.id) {
            return Err(MatchingError::not_found("Client need", need.id));
        }
        if need.is_active() {
            let signature = need.signature();
            let clash = state
                .needs
                .values()
                .any(|n| n.id != need.id && n.is_active() && n.signature() == signature);
            if clash {
                return Err(MatchingError::validation(
                    "A similar active need already exists for this client",
                ));
            }
        }
        let mut saved = need.clone();
        saved.updated_at = Utc::now();
        state.needs.insert(need.id, saved.clone());
        Ok(saved)
    }

    async fn expire_needs(&self, now: DateTime<Utc>) -> MatchingResult<u64> {
        self.check_available()?;
        let mut expired = 0;
        for need in self.state().needs.values_mut() {
            if need.is_active() && need.expires_at.is_some_and(|at| at < now) {
                need.status = crate::domains::needs::models::NeedStatus::Expired;
                need.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl BaseInventoryStore for InMemoryLedger {
    async fn find_batch(&self, id: BatchId) -> MatchingResult<Option<InventoryBatch>> {
        self.check_available()?;
        Ok(self.state().batches.get(&id).cloned())
    }

    async fn sellable_batches(&self) -> MatchingResult<Vec<InventoryBatch>> {
        self.check_available()?;
        Ok(self
            .state()
            .batches
            .values()
            .filter(|b| b.is_sellable())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseVendorSupplyStore for InMemoryLedger {
    async fn find_vendor_supply(&self, id: VendorSupplyId) -> MatchingResult<Option<VendorSupplyItem>> {
        self.check_available()?;
        Ok(self.state().vendor_supply.get(&id).cloned())
    }

    async fn available_vendor_supply(&self) -> MatchingResult<Vec<VendorSupplyItem>> {
        self.check_available()?;
        Ok(self
            .state()
            .vendor_supply
            .values()
            .filter(|v| v.is_available())
            .cloned()
            .collect())
    }

    async fn expire_vendor_supply(&self, now: DateTime<Utc>) -> MatchingResult<u64> {
        self.check_available()?;
        let mut expired = 0;
        for item in self.state().vendor_supply.values_mut() {
            if item.is_available() && item.available_until.is_some_and(|at| at < now) {
                item.status = VendorSupplyStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl BaseClientStore for InMemoryLedger {
    async fn find_client(&self, id: ClientId) -> MatchingResult<Option<Client>> {
        self.check_available()?;
        Ok(self.state().clients.get(&id).cloned())
    }

    async fn buyers(&self) -> MatchingResult<Vec<Client>> {
        self.check_available()?;
        Ok(self
            .state()
            .clients
            .values()
            .filter(|c| c.is_buyer)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseOrderStore for InMemoryLedger {
    async fn find_order(&self, id: OrderId) -> MatchingResult<Option<Order>> {
        self.check_available()?;
        Ok(self.state().orders.get(&id).cloned())
    }

    // Both writes happen under one lock and every check runs before either,
    // so a failure leaves nothing behind.
    async fn insert_order(&self, order: NewOrder, stamp: Option<QuoteStamp>) -> MatchingResult<Order> {
        self.check_available()?;
        let mut state = self.state();
        if let Some(stamp) = stamp {
            if !state.match_records.contains_key(&stamp.match_record_id) {
                return Err(MatchingError::not_found("Match record", stamp.match_record_id));
            }
            self.check_record_updates()?;
        }

        let now = Utc::now();
        let id = OrderId::from_raw(state.next_id());
        let order = order.into_order(id, now);
        state.orders.insert(id, order.clone());
        if let Some(stamp) = stamp {
            if let Some(record) = state.match_records.get_mut(&stamp.match_record_id) {
                record.apply_action(UserAction::CreatedQuote, Some(stamp.actor_id), now);
            }
        }
        Ok(order)
    }

    async fn convert_quote(
        &self,
        id: OrderId,
        sale_number: &str,
        match_record_id: Option<MatchRecordId>,
    ) -> MatchingResult<Order> {
        self.check_available()?;
        let mut state = self.state();
        let is_quote = state
            .orders
            .get(&id)
            .ok_or_else(|| MatchingError::not_found("Order", id))?
            .order_type
            == OrderType::Quote;
        if !is_quote {
            return Err(MatchingError::validation("Order is not a quote"));
        }
        if let Some(record_id) = match_record_id {
            if !state.match_records.contains_key(&record_id) {
                return Err(MatchingError::not_found("Match record", record_id));
            }
            self.check_record_updates()?;
        }

        let sale = match state.orders.get_mut(&id) {
            Some(order) => {
                order.order_type = OrderType::Sale;
                order.order_number = sale_number.to_string();
                order.converted_at = Some(Utc::now());
                order.clone()
            }
            None => return Err(MatchingError::not_found("Order", id)),
        };
        if let Some(record) = match_record_id.and_then(|rid| state.match_records.get_mut(&rid)) {
            record.mark_converted(sale.id);
        }
        Ok(sale)
    }

    async fn sales(&self, client_id: Option<ClientId>) -> MatchingResult<Vec<Order>> {
        self.check_available()?;
        let mut sales: Vec<Order> = self
            .state()
            .orders
            .values()
            .filter(|o| o.order_type == OrderType::Sale)
            .filter(|o| client_id.map_or(true, |c| o.client_id == c))
            .cloned()
            .collect();
        sales.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(sales)
    }
}

#[async_trait]
impl BaseMatchRecordStore for InMemoryLedger {
    async fn record(&self, record: NewMatchRecord) -> MatchingResult<MatchRecord> {
        self.record_write_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if self.fail_record_writes.load(Ordering::SeqCst) {
            return Err(MatchingError::Unavailable("match_records write rejected".into()));
        }
        let mut state = self.state();
        let id = MatchRecordId::from_raw(state.next_id());
        let record = record.into_record(id, Utc::now());
        state.match_records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_match_record(&self, id: MatchRecordId) -> MatchingResult<Option<MatchRecord>> {
        self.check_available()?;
        Ok(self.state().match_records.get(&id).cloned())
    }

    async fn list_match_records(&self, filter: &MatchRecordFilter) -> MatchingResult<Vec<MatchRecord>> {
        self.check_available()?;
        let mut records: Vec<MatchRecord> = self
            .state()
            .match_records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            records.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(records)
    }

    async fn update_action(
        &self,
        id: MatchRecordId,
        action: UserAction,
        actor: Option<UserId>,
    ) -> MatchingResult<MatchRecord> {
        self.check_available()?;
        self.check_record_updates()?;
        let mut state = self.state();
        let record = state
            .match_records
            .get_mut(&id)
            .ok_or_else(|| MatchingError::not_found("Match record", id))?;
        record.apply_action(action, actor, Utc::now());
        Ok(record.clone())
    }

    async fn mark_converted(&self, id: MatchRecordId, sale_order_id: OrderId) -> MatchingResult<MatchRecord> {
        self.check_available()?;
        self.check_record_updates()?;
        let mut state = self.state();
        let record = state
            .match_records
            .get_mut(&id)
            .ok_or_else(|| MatchingError::not_found("Match record", id))?;
        record.mark_converted(sale_order_id);
        Ok(record.clone())
    }
}

// =============================================================================
// Mock Strain Library
// =============================================================================

#[derive(Default)]
pub struct MockStrainLibrary {
    strains: HashMap<StrainId, (String, Option<StrainId>)>,
    failing: HashSet<StrainId>,
    lookups: AtomicUsize,
}

impl MockStrainLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strain(mut self, id: i64, name: &str) -> Self {
        self.strains
            .insert(StrainId::from_raw(id), (name.to_string(), None));
        self
    }

    /// A parent strain and its named variants.
    pub fn with_family(mut self, parent_id: i64, parent_name: &str, variants: &[(i64, &str)]) -> Self {
        let parent = StrainId::from_raw(parent_id);
        self.strains.insert(parent, (parent_name.to_string(), None));
        for (id, name) in variants {
            self.strains
                .insert(StrainId::from_raw(*id), (name.to_string(), Some(parent)));
        }
        self
    }

    /// Lookups for this id return an error.
    pub fn failing_on(mut self, id: i64) -> Self {
        self.failing.insert(StrainId::from_raw(id));
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn strain_ref(&self, id: StrainId) -> Option<StrainRef> {
        self.strains.get(&id).map(|(name, _)| StrainRef {
            id,
            name: name.clone(),
        })
    }
}

#[async_trait]
impl BaseStrainFamilyResolver for MockStrainLibrary {
    async fn strain_family(&self, id: StrainId) -> Result<Option<StrainFamily>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&id) {
            return Err(anyhow!("strain library unavailable for {}", id));
        }

        let Some((name, parent_id)) = self.strains.get(&id) else {
            return Ok(None);
        };
        let parent = parent_id.and_then(|p| self.strain_ref(p));
        let root = parent_id.unwrap_or(id);

        let mut variants: Vec<StrainRef> = self
            .strains
            .iter()
            .filter(|(_, (_, p))| *p == Some(root))
            .map(|(vid, (vname, _))| StrainRef {
                id: *vid,
                name: vname.clone(),
            })
            .collect();
        variants.sort_by_key(|v| v.id);

        Ok(Some(StrainFamily {
            strain: StrainRef {
                id,
                name: name.clone(),
            },
            parent,
            variants,
        }))
    }
}

// =============================================================================
// Mock Pricing
// =============================================================================

/// Applies per-client rules with the production rule engine; clients
/// without rules pay the base price. Each call yields once so concurrent
/// callers overlap, and the peak overlap is kept.
#[derive(Default)]
pub struct MockPricing {
    rules: Mutex<HashMap<ClientId, Vec<PricingRule>>>,
    failing: Mutex<HashSet<ClientId>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockPricing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rules(&self, client_id: ClientId, rules: Vec<PricingRule>) {
        self.rules
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(client_id, rules);
    }

    pub fn fail_for(&self, client_id: ClientId) {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(client_id);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most pricing calls that were ever running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn price(&self, client_id: ClientId, item: &PricingSubject) -> Result<f64> {
        if self
            .failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&client_id)
        {
            return Err(anyhow!("pricing rules unavailable for client {}", client_id));
        }
        let rules = self
            .rules
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&client_id)
            .cloned()
            .unwrap_or_default();
        Ok(apply_pricing_rules(item, &rules))
    }
}

#[async_trait]
impl BasePricingService for MockPricing {
    async fn price_for_client(&self, client_id: ClientId, item: &PricingSubject) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let price = self.price(client_id, item);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        price
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Bundles the fakes and builds a `ServerDeps` over them.
pub struct TestDependencies {
    pub ledger: Arc<InMemoryLedger>,
    pub strains: Arc<MockStrainLibrary>,
    pub pricing: Arc<MockPricing>,
    pub matching: MatchingConfig,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(InMemoryLedger::new()),
            strains: Arc::new(MockStrainLibrary::new()),
            pricing: Arc::new(MockPricing::new()),
            matching: MatchingConfig::default(),
        }
    }

    pub fn with_strains(mut self, strains: MockStrainLibrary) -> Self {
        self.strains = Arc::new(strains);
        self
    }

    pub fn with_matching(mut self, matching: MatchingConfig) -> Self {
        self.matching = matching;
        self
    }

    pub fn server_deps(&self) -> ServerDeps {
        let strains: Arc<dyn BaseStrainFamilyResolver> = self.strains.clone();
        ServerDeps::new(
            self.ledger.clone(),
            self.ledger.clone(),
            self.ledger.clone(),
            self.ledger.clone(),
            self.ledger.clone(),
            self.ledger.clone(),
            self.pricing.clone(),
            Arc::new(StrainFamilyCache::new(strains, Duration::from_secs(300))),
            self.matching.clone(),
        )
    }
}
