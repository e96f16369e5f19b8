use axum::routing::post;
use axum::Router;

use crate::handlers::push_subscription;
use crate::state::AppState;

/// Routes mounted at `/admin/push-subscriptions`.
///
/// ```text
/// POST   /    -> subscribe
/// DELETE /    -> unsubscribe
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        post(push_subscription::subscribe).delete(push_subscription::unsubscribe),
    )
}
