//! Server dependencies for actions (using traits for testability)
//!
//! This module provides the central dependency container used by all domain actions.
//! Every store and collaborator sits behind a trait so tests can swap in memory-backed fakes.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MatchingConfig;
use crate::domains::matching::utils::ConfidenceScorer;
use crate::kernel::pg_stores::{PgStores, PgStrainLibrary};
use crate::kernel::pricing::RuleBasedPricing;
use crate::kernel::{
    BaseClientStore, BaseInventoryStore, BaseMatchRecordStore, BaseNeedStore, BaseOrderStore,
    BasePricingService, BaseStrainFamilyResolver, BaseVendorSupplyStore, StrainFamilyCache,
};

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to actions (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub needs: Arc<dyn BaseNeedStore>,
    pub inventory: Arc<dyn BaseInventoryStore>,
    pub vendor_supply: Arc<dyn BaseVendorSupplyStore>,
    pub clients: Arc<dyn BaseClientStore>,
    pub orders: Arc<dyn BaseOrderStore>,
    pub match_records: Arc<dyn BaseMatchRecordStore>,
    pub pricing: Arc<dyn BasePricingService>,
    /// Memoized strain family lookups shared across requests
    pub strain_families: Arc<StrainFamilyCache>,
    pub matching: MatchingConfig,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        needs: Arc<dyn BaseNeedStore>,
        inventory: Arc<dyn BaseInventoryStore>,
        vendor_supply: Arc<dyn BaseVendorSupplyStore>,
        clients: Arc<dyn BaseClientStore>,
        orders: Arc<dyn BaseOrderStore>,
        match_records: Arc<dyn BaseMatchRecordStore>,
        pricing: Arc<dyn BasePricingService>,
        strain_families: Arc<StrainFamilyCache>,
        matching: MatchingConfig,
    ) -> Self {
        Self {
            needs,
            inventory,
            vendor_supply,
            clients,
            orders,
            match_records,
            pricing,
            strain_families,
            matching,
        }
    }

    /// Wire every store to Postgres.
    pub fn from_pool(pool: PgPool, strain_cache_ttl: Duration, matching: MatchingConfig) -> Self {
        let stores = Arc::new(PgStores::new(pool.clone()));
        let strains: Arc<dyn BaseStrainFamilyResolver> = Arc::new(PgStrainLibrary::new(pool.clone()));

        Self::new(
            stores.clone(),
            stores.clone(),
            stores.clone(),
            stores.clone(),
            stores.clone(),
            stores,
            Arc::new(RuleBasedPricing::new(pool)),
            Arc::new(StrainFamilyCache::new(strains, strain_cache_ttl)),
            matching,
        )
    }

    pub fn scorer(&self) -> ConfidenceScorer {
        ConfidenceScorer::new(self.strain_families.clone())
    }

    /// Fan-out width for per-candidate work.
    pub fn concurrency(&self) -> usize {
        self.matching
            .concurrency
            .clamp(1, crate::config::MAX_MATCH_CONCURRENCY)
    }
}
