//! Wholesale buyers.

pub mod models;

pub use models::{Client, ClientSummary};
