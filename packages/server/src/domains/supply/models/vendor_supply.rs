use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::common::{VendorId, VendorSupplyId};
use crate::domains::needs::models::StrainType;
use crate::error::MatchingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vendor_supply_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VendorSupplyStatus {
    Available,
    Reserved,
    Purchased,
    Expired,
}

/// A third-party offer we could broker.
#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSupplyItem {
    pub id: VendorSupplyId,
    pub vendor_id: VendorId,
    pub vendor_name: Option<String>,

    pub strain: Option<String>,
    pub product_name: Option<String>,
    pub strain_type: Option<StrainType>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub grade: Option<String>,

    pub quantity_available: f64,
    pub unit_price: Option<f64>,

    pub status: VendorSupplyStatus,
    pub available_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VendorSupplyItem {
    pub fn is_available(&self) -> bool {
        self.status == VendorSupplyStatus::Available
    }

    pub async fn find_by_id(id: VendorSupplyId, pool: &PgPool) -> MatchingResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT vs.*, v.name AS vendor_name
             FROM vendor_supply vs
             LEFT JOIN vendors v ON v.id = vs.vendor_id
             WHERE vs.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_available(pool: &PgPool) -> MatchingResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT vs.*, v.name AS vendor_name
             FROM vendor_supply vs
             LEFT JOIN vendors v ON v.id = vs.vendor_id
             WHERE vs.status = 'AVAILABLE'
             ORDER BY vs.id",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Flips AVAILABLE offers past `available_until` to EXPIRED.
    pub async fn expire_older_than(now: DateTime<Utc>, pool: &PgPool) -> MatchingResult<u64> {
        let result = sqlx::query(
            "UPDATE vendor_supply
             SET status = 'EXPIRED', updated_at = NOW()
             WHERE status = 'AVAILABLE'
               AND available_until IS NOT NULL
               AND available_until < $1",
        )
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
