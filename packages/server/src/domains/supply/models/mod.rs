pub mod batch;
pub mod purchase_history;
pub mod vendor_supply;

pub use batch::{BatchStatus, CogsMode, CostBasis, InventoryBatch, ProductSummary};
pub use purchase_history::{aggregate_patterns, lapsed_buyers, LapsedBuyer, PurchasePattern};
pub use vendor_supply::{VendorSupplyItem, VendorSupplyStatus};
