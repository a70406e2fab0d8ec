//! Matching domain - scores needs against supply in both directions and
//! keeps the audit trail of what was matched and what came of it.
//!
//! - `utils`   pure scoring (confidence, historical, subcategory affinity)
//! - `actions` forward/reverse orchestrators, opportunities, analytics
//! - `models`  match records

pub mod actions;
pub mod models;
pub mod types;
pub mod utils;

pub use models::{MatchRecord, UserAction};
pub use types::{Match, MatchResult, MatchType, NeedMatches, Opportunity, SourceKind, SupplySource};
