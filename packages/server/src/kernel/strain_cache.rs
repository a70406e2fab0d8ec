//! TTL cache in front of the strain library.
//!
//! Family lookups repeat heavily within one matching call (every candidate
//! linked to the same strain asks again), so results are memoized per strain
//! id. Entries expire after the configured TTL and the map is capped; stale
//! reads inside the TTL window are acceptable.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::{BaseStrainFamilyResolver, StrainFamily, StrainRef};
use crate::common::StrainId;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CAPACITY: usize = 10_000;

struct CachedFamily {
    family: Option<StrainFamily>,
    fetched_at: Instant,
}

pub struct StrainFamilyCache {
    resolver: Arc<dyn BaseStrainFamilyResolver>,
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<StrainId, CachedFamily>>,
}

impl StrainFamilyCache {
    pub fn new(resolver: Arc<dyn BaseStrainFamilyResolver>, ttl: Duration) -> Self {
        Self::with_capacity(resolver, ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(
        resolver: Arc<dyn BaseStrainFamilyResolver>,
        ttl: Duration,
        capacity: usize,
    ) -> Self {
        Self {
            resolver,
            ttl,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Family for `id`, from cache when fresh. Errors are not cached.
    pub async fn family(&self, id: StrainId) -> Result<Option<StrainFamily>> {
        {
            let entries = self.entries.read().await;
            if let Some(cached) = entries.get(&id) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.family.clone());
                }
            }
        }

        let family = self.resolver.strain_family(id).await?;

        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity && !entries.contains_key(&id) {
            self.evict(&mut entries);
        }
        entries.insert(
            id,
            CachedFamily {
                family: family.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(family)
    }

    /// Root of the family `id` belongs to. Unknown strains are their own root.
    pub async fn family_root(&self, id: StrainId) -> Result<StrainRef> {
        Ok(match self.family(id).await? {
            Some(family) => family.root().clone(),
            None => StrainRef {
                id,
                name: String::new(),
            },
        })
    }

    /// Shared root of two strains, if they belong to the same family.
    pub async fn shared_family(&self, a: StrainId, b: StrainId) -> Result<Option<StrainRef>> {
        let (root_a, root_b) = tokio::try_join!(self.family_root(a), self.family_root(b))?;
        Ok((root_a.id == root_b.id).then_some(root_a))
    }

    /// Drops expired entries; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, cached| cached.fetched_at.elapsed() < self.ttl);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, remaining = entries.len(), "Purged expired strain families");
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    // Expired entries go first; if none, the oldest one does.
    fn evict(&self, entries: &mut HashMap<StrainId, CachedFamily>) {
        entries.retain(|_, cached| cached.fetched_at.elapsed() < self.ttl);
        if entries.len() < self.capacity {
            return;
        }
        if let Some(oldest) = entries
            .iter()
            .min_by_key(|(_, cached)| cached.fetched_at)
            .map(|(id, _)| *id)
        {
            entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockStrainLibrary;

    fn library() -> Arc<MockStrainLibrary> {
        Arc::new(
            MockStrainLibrary::new()
                .with_family(1, "OG Kush", &[(2, "SFV OG"), (3, "Tahoe OG")])
                .with_strain(9, "Blue Dream"),
        )
    }

    #[tokio::test]
    async fn caches_within_ttl() {
        let lib = library();
        let cache = StrainFamilyCache::new(lib.clone(), DEFAULT_TTL);

        cache.family(StrainId::from_raw(2)).await.unwrap();
        cache.family(StrainId::from_raw(2)).await.unwrap();

        assert_eq!(lib.lookup_count(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn zero_ttl_always_refetches() {
        let lib = library();
        let cache = StrainFamilyCache::new(lib.clone(), Duration::ZERO);

        cache.family(StrainId::from_raw(2)).await.unwrap();
        cache.family(StrainId::from_raw(2)).await.unwrap();

        assert_eq!(lib.lookup_count(), 2);
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn variants_share_parent_root() {
        let cache = StrainFamilyCache::new(library(), DEFAULT_TTL);

        let shared = cache
            .shared_family(StrainId::from_raw(2), StrainId::from_raw(3))
            .await
            .unwrap();
        assert_eq!(shared.map(|r| r.name), Some("OG Kush".to_string()));

        let parent_and_variant = cache
            .shared_family(StrainId::from_raw(1), StrainId::from_raw(3))
            .await
            .unwrap();
        assert!(parent_and_variant.is_some());

        let unrelated = cache
            .shared_family(StrainId::from_raw(2), StrainId::from_raw(9))
            .await
            .unwrap();
        assert!(unrelated.is_none());
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let lib = Arc::new(MockStrainLibrary::new().failing_on(5));
        let cache = StrainFamilyCache::new(lib.clone(), DEFAULT_TTL);

        assert!(cache.family(StrainId::from_raw(5)).await.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn capacity_is_bounded() {
        let cache = StrainFamilyCache::with_capacity(library(), DEFAULT_TTL, 2);

        for id in [1, 2, 3, 9] {
            cache.family(StrainId::from_raw(id)).await.unwrap();
        }

        assert_eq!(cache.len().await, 2);
    }
}
