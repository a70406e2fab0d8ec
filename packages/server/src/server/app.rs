//! Application setup and server configuration.

use std::time::Duration;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    analytics_handler, cancel_need_handler, client_patterns_handler, contact_vendor_handler,
    convert_quote_handler, create_need_handler, create_quote_handler, delete_need_handler,
    dismiss_match_handler, expire_needs_handler, fulfill_need_handler, get_match_record_handler,
    get_need_handler, health_handler, inventory_buyers_handler, inventory_needs_handler,
    lapsed_buyers_handler, list_match_records_handler, list_needs_handler, need_matches_handler,
    needs_with_matches_handler, opportunities_handler, update_need_handler,
    vendor_supply_buyers_handler, vendor_supply_needs_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
    /// Present in production; health reports the database as unconfigured
    /// without it.
    pub db_pool: Option<PgPool>,
}

/// Build the Axum application router
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    let api = Router::new()
        // Needs
        .route("/needs", post(create_need_handler).get(list_needs_handler))
        .route("/needs/matches", get(needs_with_matches_handler))
        .route("/needs/expire", post(expire_needs_handler))
        .route(
            "/needs/:id",
            get(get_need_handler)
                .patch(update_need_handler)
                .delete(delete_need_handler),
        )
        .route("/needs/:id/matches", get(need_matches_handler))
        .route("/needs/:id/fulfill", post(fulfill_need_handler))
        .route("/needs/:id/cancel", post(cancel_need_handler))
        // Reverse matching
        .route("/inventory/:id/buyers", get(inventory_buyers_handler))
        .route("/inventory/:id/needs", get(inventory_needs_handler))
        .route("/vendor-supply/:id/buyers", get(vendor_supply_buyers_handler))
        .route("/vendor-supply/:id/needs", get(vendor_supply_needs_handler))
        // Buying history
        .route("/clients/:id/purchase-patterns", get(client_patterns_handler))
        .route("/lapsed-buyers", get(lapsed_buyers_handler))
        // Workflow
        .route("/quotes/from-match", post(create_quote_handler))
        .route("/quotes/:id/convert", post(convert_quote_handler))
        .route("/match-records", get(list_match_records_handler))
        .route("/match-records/analytics", get(analytics_handler))
        .route("/match-records/:id", get(get_match_record_handler))
        .route("/match-records/:id/dismiss", post(dismiss_match_handler))
        .route("/match-records/:id/contact-vendor", post(contact_vendor_handler))
        .route("/opportunities", get(opportunities_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
