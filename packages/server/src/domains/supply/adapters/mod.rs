//! Source adapters - the orchestrators' only view of supply.

pub mod historical;
pub mod inventory;
pub mod vendor;

pub use historical::{
    client_purchase_patterns, find_historical_buyers, find_lapsed_buyers, HistoricalCandidate,
};
