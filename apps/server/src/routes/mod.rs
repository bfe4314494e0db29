//! # Route Composition
//!
//! One module per resource, each exporting a `router()`. Public routes
//! (health, login) are mounted outside the auth layer; everything else
//! requires a bearer token.

use axum::middleware as axum_middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::state::AppState;

pub mod auth;
pub mod customers;
pub mod drugs;
pub mod health;
pub mod invoices;
pub mod pos;
pub mod prescriptions;
pub mod profile;
pub mod purchase_orders;
pub mod reports;
pub mod suppliers;

/// Routes that require authentication.
fn protected_router() -> Router<AppState> {
    Router::new()
        .merge(auth::protected_router())
        .merge(drugs::router())
        .merge(invoices::router())
        .merge(pos::router())
        .merge(customers::router())
        .merge(suppliers::router())
        .merge(purchase_orders::router())
        .merge(prescriptions::router())
        .merge(reports::router())
        .merge(profile::router())
}

/// Build a fully configured application with middleware and state.
pub fn build_app(state: AppState) -> Router {
    let protected = protected_router().route_layer(axum_middleware::from_fn_with_state(
        state.clone(),
        require_auth,
    ));

    Router::new()
        .merge(health::router())
        .merge(auth::public_router())
        .merge(protected)
        // CORS - the dashboard is served from a different origin in dev
        .layer(CorsLayer::permissive())
        // Request logging - outermost, executed first
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
