//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod pg_stores;
pub mod pricing;
pub mod scheduled_tasks;
pub mod strain_cache;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use pg_stores::{PgStores, PgStrainLibrary};
pub use pricing::{apply_pricing_rules, PricingRule, RuleBasedPricing};
pub use strain_cache::StrainFamilyCache;
pub use test_dependencies::TestDependencies;
pub use traits::*;
