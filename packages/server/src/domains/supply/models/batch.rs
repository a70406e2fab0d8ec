use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::common::{BatchId, ProductId, StrainId};
use crate::domains::needs::models::StrainType;
use crate::error::MatchingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "batch_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    AwaitingIntake,
    Live,
    OnHold,
    Quarantined,
    SoldOut,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cogs_mode", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CogsMode {
    Fixed,
    Range,
}

/// Cost basis of a batch. Drives the base price handed to pricing rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostBasis {
    Fixed { unit_cost: f64 },
    Range { min: f64, max: f64 },
}

impl CostBasis {
    /// Fixed cost, or the midpoint of a range. Zero means "no base price".
    pub fn pricing_base(&self) -> Option<f64> {
        let base = match *self {
            CostBasis::Fixed { unit_cost } => unit_cost,
            CostBasis::Range { min, max } => (min + max) / 2.0,
        };
        (base > 0.0).then_some(base)
    }
}

/// Flat row: batch joined with its product and strain library entry.
#[derive(FromRow, Debug, Clone)]
struct BatchRow {
    id: BatchId,
    sku: Option<String>,
    status: BatchStatus,
    grade: Option<String>,
    on_hand_qty: f64,
    cogs_mode: CogsMode,
    unit_cogs: Option<f64>,
    unit_cogs_min: Option<f64>,
    unit_cogs_max: Option<f64>,
    product_id: ProductId,
    product_name: String,
    category: Option<String>,
    subcategory: Option<String>,
    strain_id: Option<StrainId>,
    strain_name: Option<String>,
    strain_type: Option<StrainType>,
}

/// Catalog fields a batch inherits from its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub strain_id: Option<StrainId>,
    pub strain_name: Option<String>,
    pub strain_type: Option<StrainType>,
}

/// An owned inventory lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryBatch {
    pub id: BatchId,
    pub sku: Option<String>,
    pub status: BatchStatus,
    pub grade: Option<String>,
    pub on_hand_qty: f64,
    pub cost_basis: CostBasis,
    pub product: ProductSummary,
}

impl From<BatchRow> for InventoryBatch {
    fn from(row: BatchRow) -> Self {
        let cost_basis = match row.cogs_mode {
            CogsMode::Fixed => CostBasis::Fixed {
                unit_cost: row.unit_cogs.unwrap_or(0.0),
            },
            CogsMode::Range => {
                let min = row.unit_cogs_min.unwrap_or(0.0);
                CostBasis::Range {
                    min,
                    max: row.unit_cogs_max.unwrap_or(min),
                }
            }
        };

        Self {
            id: row.id,
            sku: row.sku,
            status: row.status,
            grade: row.grade,
            on_hand_qty: row.on_hand_qty,
            cost_basis,
            product: ProductSummary {
                id: row.product_id,
                name: row.product_name,
                category: row.category,
                subcategory: row.subcategory,
                strain_id: row.strain_id,
                strain_name: row.strain_name,
                strain_type: row.strain_type,
            },
        }
    }
}

const BATCH_SELECT: &str = "
    SELECT b.id, b.sku, b.status, b.grade, b.on_hand_qty,
           b.cogs_mode, b.unit_cogs, b.unit_cogs_min, b.unit_cogs_max,
           p.id AS product_id, p.name AS product_name, p.category, p.subcategory,
           p.strain_id, s.name AS strain_name, s.strain_type
    FROM batches b
    JOIN products p ON p.id = b.product_id
    LEFT JOIN strains s ON s.id = p.strain_id";

impl InventoryBatch {
    /// LIVE with stock on hand.
    pub fn is_sellable(&self) -> bool {
        self.status == BatchStatus::Live && self.on_hand_qty > 0.0
    }

    /// Strain text used for text-based comparison: the library name when
    /// linked, otherwise the product name.
    pub fn strain_text(&self) -> &str {
        self.product
            .strain_name
            .as_deref()
            .unwrap_or(&self.product.name)
    }

    pub async fn find_by_id(id: BatchId, pool: &PgPool) -> MatchingResult<Option<Self>> {
        let sql = format!("{BATCH_SELECT} WHERE b.id = $1");
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find_sellable(pool: &PgPool) -> MatchingResult<Vec<Self>> {
        let sql = format!(
            "{BATCH_SELECT} WHERE b.status = 'LIVE' AND b.on_hand_qty > 0 ORDER BY b.id"
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql).fetch_all(pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_cost_is_the_base() {
        assert_eq!(CostBasis::Fixed { unit_cost: 80.0 }.pricing_base(), Some(80.0));
    }

    #[test]
    fn range_uses_midpoint() {
        let basis = CostBasis::Range { min: 60.0, max: 100.0 };
        assert_eq!(basis.pricing_base(), Some(80.0));
    }

    #[test]
    fn zero_cost_means_no_base() {
        assert_eq!(CostBasis::Fixed { unit_cost: 0.0 }.pricing_base(), None);
        assert_eq!(CostBasis::Range { min: 0.0, max: 0.0 }.pricing_base(), None);
    }

    #[test]
    fn range_without_max_collapses_to_min() {
        let row = BatchRow {
            id: BatchId::from_raw(1),
            sku: None,
            status: BatchStatus::Live,
            grade: None,
            on_hand_qty: 5.0,
            cogs_mode: CogsMode::Range,
            unit_cogs: None,
            unit_cogs_min: Some(40.0),
            unit_cogs_max: None,
            product_id: ProductId::from_raw(1),
            product_name: "Gelato".into(),
            category: Some("Flower".into()),
            subcategory: None,
            strain_id: None,
            strain_name: None,
            strain_type: None,
        };
        let batch = InventoryBatch::from(row);
        assert_eq!(batch.cost_basis.pricing_base(), Some(40.0));
        assert_eq!(batch.strain_text(), "Gelato");
    }
}
