//! Computed match shapes shared by the orchestrators, the workflow service and
//! the HTTP layer.

use serde::{Deserialize, Serialize};

use crate::common::{ClientId, ClientNeedId, MatchRecordId, StrainId};
use crate::domains::clients::ClientSummary;
use crate::domains::needs::models::{ClientNeed, NeedPriority, StrainType};
use crate::domains::supply::models::{InventoryBatch, PurchasePattern, VendorSupplyItem};

/// Matches below this confidence are dropped.
pub const MIN_CONFIDENCE: f64 = 50.0;

/// Explicit matches at or above this confidence are `EXACT`.
pub const EXACT_CONFIDENCE: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Close,
    Historical,
}

impl MatchType {
    /// Classification for a need-driven (non-historical) match.
    pub fn classify(confidence: f64) -> Self {
        if confidence >= EXACT_CONFIDENCE {
            MatchType::Exact
        } else {
            MatchType::Close
        }
    }

    /// Tie-break rank when two types perform equally; lower ranks first.
    pub fn rank(&self) -> u8 {
        match self {
            MatchType::Exact => 0,
            MatchType::Close => 1,
            MatchType::Historical => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "source_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Inventory,
    Vendor,
    Historical,
}

/// A client whose sales history repeatedly matches a supply signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBuyer {
    pub client: ClientSummary,
    pub pattern: PurchasePattern,
    pub is_lapsed_buyer: bool,
}

/// The candidate a match was scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplySource {
    Inventory(InventoryBatch),
    Vendor(VendorSupplyItem),
    Historical(HistoricalBuyer),
}

impl SupplySource {
    pub fn kind(&self) -> SourceKind {
        match self {
            SupplySource::Inventory(_) => SourceKind::Inventory,
            SupplySource::Vendor(_) => SourceKind::Vendor,
            SupplySource::Historical(_) => SourceKind::Historical,
        }
    }

    /// Batch id, vendor supply id, or the historical buyer's client id.
    pub fn source_id(&self) -> i64 {
        match self {
            SupplySource::Inventory(batch) => batch.id.into_raw(),
            SupplySource::Vendor(item) => item.id.into_raw(),
            SupplySource::Historical(buyer) => buyer.client.id.into_raw(),
        }
    }

    /// Quantity the candidate can supply, where that is meaningful.
    pub fn available_quantity(&self) -> Option<f64> {
        match self {
            SupplySource::Inventory(batch) => Some(batch.on_hand_qty),
            SupplySource::Vendor(item) => Some(item.quantity_available),
            SupplySource::Historical(_) => None,
        }
    }

    /// Product signature used to look up historical buyers.
    pub fn signature(&self) -> SupplySignature {
        match self {
            SupplySource::Inventory(batch) => SupplySignature {
                strain: Some(batch.strain_text().to_string()),
                category: batch.product.category.clone(),
                subcategory: batch.product.subcategory.clone(),
                grade: batch.grade.clone(),
            },
            SupplySource::Vendor(item) => SupplySignature {
                strain: item.strain.clone(),
                category: item.category.clone(),
                subcategory: item.subcategory.clone(),
                grade: item.grade.clone(),
            },
            SupplySource::Historical(buyer) => SupplySignature {
                strain: buyer.pattern.strain.clone(),
                category: buyer.pattern.category.clone(),
                subcategory: buyer.pattern.subcategory.clone(),
                grade: buyer.pattern.grade.clone(),
            },
        }
    }

    /// Scorer view of this candidate at the given price.
    pub fn candidate(&self, price: Option<f64>) -> ScoringCandidate<'_> {
        match self {
            SupplySource::Inventory(batch) => ScoringCandidate {
                strain: Some(batch.strain_text()),
                strain_id: batch.product.strain_id,
                strain_type: batch.product.strain_type,
                product_name: Some(&batch.product.name),
                category: batch.product.category.as_deref(),
                subcategory: batch.product.subcategory.as_deref(),
                grade: batch.grade.as_deref(),
                price,
                available_quantity: Some(batch.on_hand_qty),
            },
            SupplySource::Vendor(item) => ScoringCandidate {
                strain: item.strain.as_deref(),
                strain_id: None,
                strain_type: item.strain_type,
                product_name: item.product_name.as_deref(),
                category: item.category.as_deref(),
                subcategory: item.subcategory.as_deref(),
                grade: item.grade.as_deref(),
                price,
                available_quantity: Some(item.quantity_available),
            },
            SupplySource::Historical(buyer) => ScoringCandidate {
                strain: buyer.pattern.strain.as_deref(),
                strain_id: None,
                strain_type: None,
                product_name: None,
                category: buyer.pattern.category.as_deref(),
                subcategory: buyer.pattern.subcategory.as_deref(),
                grade: buyer.pattern.grade.as_deref(),
                price,
                available_quantity: None,
            },
        }
    }
}

/// strain/category/subcategory/grade of a supply item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplySignature {
    pub strain: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub grade: Option<String>,
}

impl From<&ClientNeed> for SupplySignature {
    fn from(need: &ClientNeed) -> Self {
        Self {
            strain: need.strain.clone(),
            category: need.category.clone(),
            subcategory: need.subcategory.clone(),
            grade: need.grade.clone(),
        }
    }
}

/// Borrowed, flattened candidate fields the scorer compares.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringCandidate<'a> {
    pub strain: Option<&'a str>,
    pub strain_id: Option<StrainId>,
    pub strain_type: Option<StrainType>,
    pub product_name: Option<&'a str>,
    pub category: Option<&'a str>,
    pub subcategory: Option<&'a str>,
    pub grade: Option<&'a str>,
    pub price: Option<f64>,
    pub available_quantity: Option<f64>,
}

/// A scored pairing of a need (or buyer) with a supply candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_type: MatchType,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub source_kind: SourceKind,
    pub source_id: i64,
    pub source: SupplySource,
    pub calculated_price: Option<f64>,
    pub available_quantity: Option<f64>,
    /// Audit record written for this match, when the write succeeded.
    #[serde(default)]
    pub match_record_id: Option<MatchRecordId>,
}

impl Match {
    pub fn new(
        match_type: MatchType,
        confidence: f64,
        reasons: Vec<String>,
        source: SupplySource,
        calculated_price: Option<f64>,
    ) -> Self {
        Self {
            match_type,
            confidence,
            reasons,
            source_kind: source.kind(),
            source_id: source.source_id(),
            available_quantity: source.available_quantity(),
            source,
            calculated_price,
            match_record_id: None,
        }
    }
}

/// Forward-matching result for one need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedMatches {
    pub need_id: ClientNeedId,
    pub client_id: ClientId,
    pub matches: Vec<Match>,
}

impl NeedMatches {
    pub fn top_confidence(&self) -> f64 {
        self.matches.first().map_or(0.0, |m| m.confidence)
    }
}

/// One reverse-matching entry: a buyer, the need it came from (if any), and
/// the single match against the supply item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub client_id: ClientId,
    pub need_id: Option<ClientNeedId>,
    pub matches: Vec<Match>,
}

impl MatchResult {
    pub fn top_confidence(&self) -> f64 {
        self.matches.first().map_or(0.0, |m| m.confidence)
    }
}

/// An active need with supply waiting, for the sales dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub need_id: ClientNeedId,
    pub client_id: ClientId,
    pub client_name: String,
    pub priority: NeedPriority,
    pub notes: Option<String>,
    pub strain: Option<String>,
    pub category: Option<String>,
    pub match_count: usize,
    pub top_confidence: f64,
    pub potential_revenue: Option<f64>,
    pub best_match: Option<Match>,
}

/// Descending by confidence; equal scores keep discovery order.
pub fn sort_by_confidence<T>(items: &mut [(usize, T)], confidence: impl Fn(&T) -> f64) {
    items.sort_by(|(ia, a), (ib, b)| {
        confidence(b)
            .total_cmp(&confidence(a))
            .then_with(|| ia.cmp(ib))
    });
}
