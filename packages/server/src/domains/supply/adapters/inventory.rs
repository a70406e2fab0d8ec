//! Owned inventory: sellable batches and client-specific sell prices.

use tracing::{debug, warn};

use crate::common::{BatchId, ClientId};
use crate::domains::supply::models::InventoryBatch;
use crate::error::{MatchingError, MatchingResult};
use crate::kernel::{PricingSubject, ServerDeps};

/// LIVE batches with stock on hand.
pub async fn sellable_batches(deps: &ServerDeps) -> MatchingResult<Vec<InventoryBatch>> {
    deps.inventory.sellable_batches().await
}

pub async fn get_batch(id: BatchId, deps: &ServerDeps) -> MatchingResult<InventoryBatch> {
    deps.inventory
        .find_batch(id)
        .await?
        .ok_or_else(|| MatchingError::not_found("Inventory batch", id))
}

/// What pricing rules see for a batch. `None` without a usable cost basis.
pub fn pricing_subject(batch: &InventoryBatch) -> Option<PricingSubject> {
    let base_price = batch.cost_basis.pricing_base()?;
    Some(PricingSubject {
        base_price,
        category: batch.product.category.clone(),
        subcategory: batch.product.subcategory.clone(),
        strain: Some(batch.strain_text().to_string()),
        grade: batch.grade.clone(),
    })
}

/// Sell price of `batch` for `client_id`.
///
/// Returns `None` when the batch has no cost basis or the pricing service
/// fails; the batch is then scored without a price.
pub async fn client_price(batch: &InventoryBatch, client_id: ClientId, deps: &ServerDeps) -> Option<f64> {
    let Some(subject) = pricing_subject(batch) else {
        debug!(batch_id = %batch.id, "Batch has no cost basis; skipping pricing");
        return None;
    };

    match deps.pricing.price_for_client(client_id, &subject).await {
        Ok(price) => Some(price),
        Err(e) => {
            warn!(
                batch_id = %batch.id,
                client_id = %client_id,
                error = %e,
                "Client pricing failed; scoring without price"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ProductId;
    use crate::domains::supply::models::{BatchStatus, CostBasis, ProductSummary};

    fn batch(cost_basis: CostBasis) -> InventoryBatch {
        InventoryBatch {
            id: BatchId::from_raw(7),
            sku: None,
            status: BatchStatus::Live,
            grade: Some("AAA".into()),
            on_hand_qty: 12.0,
            cost_basis,
            product: ProductSummary {
                id: ProductId::from_raw(3),
                name: "Gelato #41".into(),
                category: Some("Flower".into()),
                subcategory: None,
                strain_id: None,
                strain_name: Some("Gelato".into()),
                strain_type: None,
            },
        }
    }

    #[test]
    fn subject_uses_range_midpoint() {
        let subject = pricing_subject(&batch(CostBasis::Range { min: 80.0, max: 100.0 })).unwrap();
        assert_eq!(subject.base_price, 90.0);
        assert_eq!(subject.strain.as_deref(), Some("Gelato"));
    }

    #[test]
    fn zero_cost_has_no_subject() {
        assert!(pricing_subject(&batch(CostBasis::Fixed { unit_cost: 0.0 })).is_none());
    }
}
