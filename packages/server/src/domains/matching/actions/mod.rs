//! Matching actions - the orchestrators.
//!
//! Per-candidate work (pricing, family lookup, record write) fans out with
//! bounded concurrency; results are ordered by a stable sort afterwards, never
//! by completion order. Orchestrators that walk many needs do so one need at
//! a time, so only one level fans out.

mod analytics;
mod forward;
mod opportunities;
mod recording;
mod reverse;

pub use analytics::{get_match_analytics, get_match_record, list_match_records};
pub use forward::{find_matches_for_need, get_all_active_needs_with_matches, match_need};
pub use opportunities::{get_smart_opportunities, DEFAULT_OPPORTUNITY_LIMIT};
pub use reverse::{
    find_buyers_for_inventory, find_buyers_for_vendor_supply, find_client_needs_for_batch,
    find_client_needs_for_vendor_supply,
};
