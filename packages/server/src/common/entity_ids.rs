//! Typed ID definitions for all ledger entities.
//!
//! ```rust
//! use matching_core::common::{BatchId, ClientNeedId};
//!
//! let need_id = ClientNeedId::from_raw(1);
//! let batch_id = BatchId::from_raw(1);
//! // need_id == batch_id does not compile
//! ```

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker for wholesale clients (buyers).
pub struct Client;

/// Marker for a client's standing demand.
pub struct ClientNeed;

/// Marker for owned inventory batches.
pub struct Batch;

/// Marker for catalog products a batch belongs to.
pub struct Product;

/// Marker for third-party vendor offers.
pub struct VendorSupply;

/// Marker for vendors.
pub struct Vendor;

/// Marker for strain library entries.
pub struct Strain;

/// Marker for match audit records.
pub struct MatchRecord;

/// Marker for orders (quotes and sales share one table).
pub struct Order;

/// Marker for internal users acting on matches.
pub struct User;

/// Marker for pricing rules.
pub struct PricingRule;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type ClientId = Id<Client>;
pub type ClientNeedId = Id<ClientNeed>;
pub type BatchId = Id<Batch>;
pub type ProductId = Id<Product>;
pub type VendorSupplyId = Id<VendorSupply>;
pub type VendorId = Id<Vendor>;
pub type StrainId = Id<Strain>;
pub type MatchRecordId = Id<MatchRecord>;
pub type OrderId = Id<Order>;
pub type UserId = Id<User>;
pub type PricingRuleId = Id<PricingRule>;
