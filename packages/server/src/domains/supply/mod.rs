//! Supply domain - owned inventory, vendor offers and buying history
//!
//! The three adapters are the only way the matching orchestrators see supply.

pub mod adapters;
pub mod models;

pub use models::{InventoryBatch, PurchasePattern, VendorSupplyItem};
