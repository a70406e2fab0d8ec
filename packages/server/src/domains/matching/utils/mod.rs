pub mod historical_scoring;
pub mod scoring;
pub mod subcategory;

pub use historical_scoring::score_pattern;
pub use scoring::{score_candidate, ConfidenceScorer, FamilyCheck, Score};
pub use subcategory::SubcategoryRelation;
