//! Need actions - business logic functions
//!
//! Actions take `&ServerDeps` and return `MatchingResult`; HTTP handlers are
//! thin wrappers around them.

mod lifecycle;
mod queries;

pub use lifecycle::{
    cancel_need, create_need, delete_need, expire_old_needs, fulfill_need, get_need, list_needs,
    update_need, CreateNeedOutcome, DUPLICATE_NEED_MESSAGE,
};
pub use queries::{list_needs_with_match_counts, NeedWithMatchCount};
