//! Test harness over the in-memory ledger.
//!
//! Each test gets a fresh ledger, strain library and pricing fake wired into
//! a real `ServerDeps`, so actions run exactly as they do in production.

use matching_core::kernel::test_dependencies::{InMemoryLedger, MockStrainLibrary};
use matching_core::kernel::{ServerDeps, TestDependencies};
use matching_core::server::{build_app, AppState};
use std::time::Duration;
use test_context::AsyncTestContext;

/// Test harness that owns the fakes for one test.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let client = ctx.ledger().add_client("Green Leaf");
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    pub test_deps: TestDependencies,
    pub deps: ServerDeps,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        Self::new(TestDependencies::new())
    }

    async fn teardown(self) {}
}

impl TestHarness {
    pub fn new(test_deps: TestDependencies) -> Self {
        let deps = test_deps.server_deps();
        Self { test_deps, deps }
    }

    /// Harness whose strain library knows the given families.
    pub fn with_strains(strains: MockStrainLibrary) -> Self {
        Self::new(TestDependencies::new().with_strains(strains))
    }

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.test_deps.ledger
    }

    /// The HTTP router over this harness's deps, without a database pool.
    pub fn app(&self) -> axum::Router {
        build_app(
            AppState {
                deps: self.deps.clone(),
                db_pool: None,
            },
            Duration::from_secs(5),
        )
    }
}
