//! Third-party vendor offers.

use crate::common::VendorSupplyId;
use crate::domains::supply::models::VendorSupplyItem;
use crate::error::{MatchingError, MatchingResult};
use crate::kernel::ServerDeps;

/// Offers still AVAILABLE.
pub async fn available_supply(deps: &ServerDeps) -> MatchingResult<Vec<VendorSupplyItem>> {
    deps.vendor_supply.available_vendor_supply().await
}

pub async fn get_vendor_supply(id: VendorSupplyId, deps: &ServerDeps) -> MatchingResult<VendorSupplyItem> {
    deps.vendor_supply
        .find_vendor_supply(id)
        .await?
        .ok_or_else(|| MatchingError::not_found("Vendor supply", id))
}
