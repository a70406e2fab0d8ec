//! Workflow actions - turn matches into quotes and record what users did
//! with them.

mod intake;
mod match_actions;
mod quotes;

pub use intake::{create_need_and_find_matches, NeedWithMatches};
pub use match_actions::{contact_vendor, dismiss_match};
pub use quotes::{convert_quote_to_sale, create_quote_from_match, quote_line, CreateQuoteInput};
