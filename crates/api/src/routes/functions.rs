//! Route definitions for the serverless-style functions.
//!
//! Mounted outside the API CORS and timeout layers: the function answers
//! every origin with its own headers, panics included.

use axum::middleware::map_response;
use axum::routing::post;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;

use crate::handlers::functions;
use crate::state::AppState;

/// Routes mounted at `/functions/v1`.
///
/// ```text
/// POST    /send-push-notification   -> send_push_notification
/// OPTIONS /send-push-notification   -> preflight
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/send-push-notification",
            post(functions::send_push_notification).options(functions::preflight),
        )
        .layer(CatchPanicLayer::new())
        .layer(map_response(functions::with_cors_headers))
}
