//! Route definitions for quote requests.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::quote;
use crate::state::AppState;

/// Routes mounted at `/quotes`.
///
/// ```text
/// POST   /    -> submit_quote
/// ```
pub fn public_router() -> Router<AppState> {
    Router::new().route("/", post(quote::submit_quote))
}

/// Routes mounted at `/admin/quotes`.
///
/// ```text
/// GET    /          -> list_quotes
/// GET    /counts    -> count_quotes
/// GET    /{id}      -> get_quote
/// PATCH  /{id}      -> update_quote
/// ```
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(quote::list_quotes))
        .route("/counts", get(quote::count_quotes))
        .route("/{id}", get(quote::get_quote).patch(quote::update_quote))
}
