// Needs Matching Server - matching core
//
// Pairs buyer needs with sellable inventory, vendor offers and purchase
// history, and tracks each suggestion through quote and sale.
//
// Domains live under domains/*; infrastructure (stores, caches, scheduler)
// under kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod error;
pub mod kernel;
pub mod server;

pub use config::*;
pub use error::{MatchingError, MatchingResult};
