//! Needs domain - clients' standing demand and its lifecycle.

pub mod actions;
pub mod models;

pub use models::{ClientNeed, NeedFilter, NeedPriority, NeedStatus, NewClientNeed};
