//! Orders domain - quotes drafted from matches and their conversion to sales.

pub mod actions;
pub mod models;

pub use models::{Order, OrderLine, OrderType};
