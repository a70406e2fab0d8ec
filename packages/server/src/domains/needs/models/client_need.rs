use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;

use crate::common::text::normalize;
use crate::common::{ClientId, ClientNeedId, StrainId, UserId};
use crate::error::{MatchingError, MatchingResult};

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "need_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NeedStatus {
    #[default]
    Active,
    Fulfilled,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "need_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NeedPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Strain type preference. `Any` only appears on the demand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "strain_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrainType {
    Indica,
    Sativa,
    Hybrid,
    Cbd,
    Any,
}

impl StrainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrainType::Indica => "INDICA",
            StrainType::Sativa => "SATIVA",
            StrainType::Hybrid => "HYBRID",
            StrainType::Cbd => "CBD",
            StrainType::Any => "ANY",
        }
    }
}

impl std::fmt::Display for StrainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ClientNeed Model
// ============================================================================

/// A client's standing demand signature.
#[derive(FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientNeed {
    pub id: ClientNeedId,
    pub client_id: ClientId,

    // What the client wants
    pub strain: Option<String>,
    pub product_name: Option<String>,
    pub strain_id: Option<StrainId>,
    pub strain_type: Option<StrainType>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub grade: Option<String>,

    // How much, at what price
    pub quantity_min: Option<f64>,
    pub quantity_max: Option<f64>,
    pub price_max: Option<f64>,

    pub status: NeedStatus,
    pub priority: NeedPriority,

    pub needed_by: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,
    pub internal_notes: Option<String>,

    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields that identify a duplicate active need for the same client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeedSignature {
    pub client_id: ClientId,
    pub strain: String,
    pub category: String,
    pub subcategory: String,
    pub grade: String,
}

impl NeedSignature {
    pub fn new(
        client_id: ClientId,
        strain: Option<&str>,
        category: Option<&str>,
        subcategory: Option<&str>,
        grade: Option<&str>,
    ) -> Self {
        Self {
            client_id,
            strain: normalize(strain),
            category: normalize(category),
            subcategory: normalize(subcategory),
            grade: normalize(grade),
        }
    }
}

/// Input for creating a need.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(default, setter(strip_option, into)))]
pub struct NewClientNeed {
    #[builder(!default, setter(!strip_option))]
    pub client_id: ClientId,
    #[serde(default)]
    pub strain: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub strain_id: Option<StrainId>,
    #[serde(default)]
    pub strain_type: Option<StrainType>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub quantity_min: Option<f64>,
    #[serde(default)]
    pub quantity_max: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
    #[serde(default)]
    #[builder(setter(!strip_option))]
    pub priority: NeedPriority,
    #[serde(default)]
    pub needed_by: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<UserId>,
}

/// Partial update applied to an existing need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeedUpdate {
    pub strain: Option<String>,
    pub strain_id: Option<StrainId>,
    pub strain_type: Option<StrainType>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub grade: Option<String>,
    pub quantity_min: Option<f64>,
    pub quantity_max: Option<f64>,
    pub price_max: Option<f64>,
    pub priority: Option<NeedPriority>,
    pub status: Option<NeedStatus>,
    pub needed_by: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
}

/// Filters for listing needs. All set fields must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeedFilter {
    pub status: Option<NeedStatus>,
    pub client_id: Option<ClientId>,
    pub priority: Option<NeedPriority>,
    pub strain: Option<String>,
    pub category: Option<String>,
}

impl NeedFilter {
    pub fn active() -> Self {
        Self {
            status: Some(NeedStatus::Active),
            ..Default::default()
        }
    }

    pub fn matches(&self, need: &ClientNeed) -> bool {
        need.deleted_at.is_none()
            && self.status.map_or(true, |s| need.status == s)
            && self.client_id.map_or(true, |c| need.client_id == c)
            && self.priority.map_or(true, |p| need.priority == p)
            && self
                .strain
                .as_deref()
                .map_or(true, |s| need.strain.as_deref() == Some(s))
            && self
                .category
                .as_deref()
                .map_or(true, |c| need.category.as_deref() == Some(c))
    }
}

/// Outcome of a duplicate-checked insert.
#[derive(Debug, Clone)]
pub enum NeedInsert {
    Created(ClientNeed),
    Duplicate(ClientNeed),
}

fn validate_fields(
    quantity_min: Option<f64>,
    quantity_max: Option<f64>,
    price_max: Option<f64>,
    needed_by: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
) -> MatchingResult<()> {
    if quantity_min.is_some_and(|q| q < 0.0) || quantity_max.is_some_and(|q| q < 0.0) {
        return Err(MatchingError::validation("Quantities cannot be negative"));
    }
    if price_max.is_some_and(|p| p < 0.0) {
        return Err(MatchingError::validation("Maximum price cannot be negative"));
    }
    if let (Some(min), Some(max)) = (quantity_min, quantity_max) {
        if max < min {
            return Err(MatchingError::validation(
                "Maximum quantity must be greater than or equal to minimum quantity",
            ));
        }
    }
    if let (Some(needed_by), Some(expires_at)) = (needed_by, expires_at) {
        if expires_at <= needed_by {
            return Err(MatchingError::validation(
                "Expiration date must be after needed by date",
            ));
        }
    }
    Ok(())
}

impl NewClientNeed {
    pub fn validate(&self) -> MatchingResult<()> {
        validate_fields(
            self.quantity_min,
            self.quantity_max,
            self.price_max,
            self.needed_by,
            self.expires_at,
        )
    }

    pub fn signature(&self) -> NeedSignature {
        NeedSignature::new(
            self.client_id,
            self.strain.as_deref(),
            self.category.as_deref(),
            self.subcategory.as_deref(),
            self.grade.as_deref(),
        )
    }

    /// Materializes the row an in-memory store would hold.
    pub fn into_need(self, id: ClientNeedId, now: DateTime<Utc>) -> ClientNeed {
        ClientNeed {
            id,
            client_id: self.client_id,
            strain: self.strain,
            product_name: self.product_name,
            strain_id: self.strain_id,
            strain_type: self.strain_type,
            category: self.category,
            subcategory: self.subcategory,
            grade: self.grade,
            quantity_min: self.quantity_min,
            quantity_max: self.quantity_max,
            price_max: self.price_max,
            status: NeedStatus::Active,
            priority: self.priority,
            needed_by: self.needed_by,
            expires_at: self.expires_at,
            fulfilled_at: None,
            notes: self.notes,
            internal_notes: self.internal_notes,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

impl ClientNeed {
    pub fn validate(&self) -> MatchingResult<()> {
        validate_fields(
            self.quantity_min,
            self.quantity_max,
            self.price_max,
            self.needed_by,
            self.expires_at,
        )
    }

    pub fn signature(&self) -> NeedSignature {
        NeedSignature::new(
            self.client_id,
            self.strain.as_deref(),
            self.category.as_deref(),
            self.subcategory.as_deref(),
            self.grade.as_deref(),
        )
    }

    pub fn is_active(&self) -> bool {
        self.status == NeedStatus::Active && self.deleted_at.is_none()
    }

    /// Applies a partial update. Validation is left to the caller.
    pub fn apply(&mut self, update: NeedUpdate, now: DateTime<Utc>) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = update.$field { self.$field = Some(v); })*
            };
        }
        set!(
            strain,
            strain_id,
            strain_type,
            product_name,
            category,
            subcategory,
            grade,
            quantity_min,
            quantity_max,
            price_max,
            needed_by,
            expires_at,
            notes,
            internal_notes
        );
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = now;
    }

    /// Naive revenue estimate: minimum quantity at the client's ceiling price.
    pub fn potential_revenue(&self) -> Option<f64> {
        match (self.quantity_min, self.price_max) {
            (Some(qty), Some(price)) => Some(qty * price),
            _ => None,
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub async fn find_by_id(id: ClientNeedId, pool: &PgPool) -> MatchingResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM client_needs WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list(filter: &NeedFilter, pool: &PgPool) -> MatchingResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM client_needs
             WHERE deleted_at IS NULL
               AND ($1::need_status IS NULL OR status = $1)
               AND ($2::BIGINT IS NULL OR client_id = $2)
               AND ($3::need_priority IS NULL OR priority = $3)
               AND ($4::TEXT IS NULL OR strain = $4)
               AND ($5::TEXT IS NULL OR category = $5)
             ORDER BY created_at DESC, id DESC",
        )
        .bind(filter.status)
        .bind(filter.client_id)
        .bind(filter.priority)
        .bind(&filter.strain)
        .bind(&filter.category)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Finds the ACTIVE need sharing this signature, if any.
    pub async fn find_active_by_signature(
        signature: &NeedSignature,
        pool: &PgPool,
    ) -> MatchingResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM client_needs
             WHERE client_id = $1
               AND status = 'ACTIVE'
               AND deleted_at IS NULL
               AND lower(btrim(coalesce(strain, ''))) = $2
               AND lower(btrim(coalesce(category, ''))) = $3
               AND lower(btrim(coalesce(subcategory, ''))) = $4
               AND lower(btrim(coalesce(grade, ''))) = $5
             LIMIT 1",
        )
        .bind(signature.client_id)
        .bind(&signature.strain)
        .bind(&signature.category)
        .bind(&signature.subcategory)
        .bind(&signature.grade)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Inserts unless an ACTIVE need with the same signature exists.
    ///
    /// The partial unique index `uq_client_needs_active_signature` makes the
    /// check-and-insert atomic: a concurrent loser hits `ON CONFLICT DO NOTHING`
    /// and reads back the winner's row.
    pub async fn insert_unique(new: NewClientNeed, pool: &PgPool) -> MatchingResult<NeedInsert> {
        let signature = new.signature();

        let inserted = sqlx::query_as::<_, Self>(
            "INSERT INTO client_needs (
                client_id, strain, product_name, strain_id, strain_type,
                category, subcategory, grade,
                quantity_min, quantity_max, price_max,
                status, priority, needed_by, expires_at,
                notes, internal_notes, created_by
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'ACTIVE', $12, $13, $14, $15, $16, $17)
             ON CONFLICT DO NOTHING
             RETURNING *",
        )
        .bind(new.client_id)
        .bind(&new.strain)
        .bind(&new.product_name)
        .bind(new.strain_id)
        .bind(new.strain_type)
        .bind(&new.category)
        .bind(&new.subcategory)
        .bind(&new.grade)
        .bind(new.quantity_min)
        .bind(new.quantity_max)
        .bind(new.price_max)
        .bind(new.priority)
        .bind(new.needed_by)
        .bind(new.expires_at)
        .bind(&new.notes)
        .bind(&new.internal_notes)
        .bind(new.created_by)
        .fetch_optional(pool)
        .await?;

        if let Some(need) = inserted {
            return Ok(NeedInsert::Created(need));
        }

        Self::find_active_by_signature(&signature, pool)
            .await?
            .map(NeedInsert::Duplicate)
            .ok_or_else(|| {
                MatchingError::Unavailable(
                    "need insert conflicted but no active duplicate was found".to_string(),
                )
            })
    }

    /// Writes every mutable column back.
    pub async fn save(&self, pool: &PgPool) -> MatchingResult<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE client_needs SET
                strain = $2, strain_id = $3, strain_type = $4, product_name = $5,
                category = $6, subcategory = $7, grade = $8,
                quantity_min = $9, quantity_max = $10, price_max = $11,
                status = $12, priority = $13, needed_by = $14, expires_at = $15,
                fulfilled_at = $16, notes = $17, internal_notes = $18,
                deleted_at = $19, updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(self.id)
        .bind(&self.strain)
        .bind(self.strain_id)
        .bind(self.strain_type)
        .bind(&self.product_name)
        .bind(&self.category)
        .bind(&self.subcategory)
        .bind(&self.grade)
        .bind(self.quantity_min)
        .bind(self.quantity_max)
        .bind(self.price_max)
        .bind(self.status)
        .bind(self.priority)
        .bind(self.needed_by)
        .bind(self.expires_at)
        .bind(self.fulfilled_at)
        .bind(&self.notes)
        .bind(&self.internal_notes)
        .bind(self.deleted_at)
        .fetch_optional(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => MatchingError::validation(
                "A similar active need already exists for this client",
            ),
            other => other.into(),
        })?
        .ok_or_else(|| MatchingError::not_found("Client need", self.id))
    }

    /// Flips ACTIVE needs whose `expires_at` has passed to EXPIRED.
    pub async fn expire_older_than(now: DateTime<Utc>, pool: &PgPool) -> MatchingResult<u64> {
        let result = sqlx::query(
            "UPDATE client_needs
             SET status = 'EXPIRED', updated_at = NOW()
             WHERE status = 'ACTIVE'
               AND deleted_at IS NULL
               AND expires_at IS NOT NULL
               AND expires_at < $1",
        )
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> NewClientNeed {
        NewClientNeed::builder()
            .client_id(ClientId::from_raw(1))
            .category("Flower")
            .build()
    }

    #[test]
    fn rejects_inverted_quantity_range() {
        let mut need = base();
        need.quantity_min = Some(20.0);
        need.quantity_max = Some(10.0);
        assert!(matches!(need.validate(), Err(MatchingError::Validation(_))));
    }

    #[test]
    fn accepts_equal_quantity_bounds() {
        let mut need = base();
        need.quantity_min = Some(10.0);
        need.quantity_max = Some(10.0);
        assert!(need.validate().is_ok());
    }

    #[test]
    fn expiry_must_follow_needed_by() {
        let now = Utc::now();
        let mut need = base();
        need.needed_by = Some(now);
        need.expires_at = Some(now);
        assert!(need.validate().is_err());

        need.expires_at = Some(now + Duration::days(1));
        assert!(need.validate().is_ok());
    }

    #[test]
    fn signature_ignores_case_and_blank_fields() {
        let a = NeedSignature::new(ClientId::from_raw(1), Some(" OG Kush"), Some("Flower"), None, Some(""));
        let b = NeedSignature::new(ClientId::from_raw(1), Some("og kush"), Some("flower "), Some(" "), None);
        assert_eq!(a, b);
    }

    #[test]
    fn apply_touches_only_provided_fields() {
        let now = Utc::now();
        let mut need = base().into_need(ClientNeedId::from_raw(5), now);
        need.apply(
            NeedUpdate {
                grade: Some("AAA".into()),
                priority: Some(NeedPriority::Urgent),
                ..Default::default()
            },
            now,
        );
        assert_eq!(need.grade.as_deref(), Some("AAA"));
        assert_eq!(need.category.as_deref(), Some("Flower"));
        assert_eq!(need.priority, NeedPriority::Urgent);
    }

    #[test]
    fn potential_revenue_needs_both_fields() {
        let now = Utc::now();
        let mut need = base().into_need(ClientNeedId::from_raw(1), now);
        assert_eq!(need.potential_revenue(), None);
        need.quantity_min = Some(10.0);
        need.price_max = Some(100.0);
        assert_eq!(need.potential_revenue(), Some(1000.0));
    }
}
