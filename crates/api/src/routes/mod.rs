pub mod functions;
pub mod health;
pub mod project;
pub mod push_subscription;
pub mod quote;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                  gallery feed (public)
/// /projects/refresh                          reload feed (admin)
///
/// /quotes                                    submit quote request (public)
///
/// /admin/projects                            list, create
/// /admin/projects/{id}                       get, update, delete
/// /admin/projects/{id}/images                list, add
/// /admin/projects/{id}/images/order          reorder (PUT)
/// /admin/projects/{id}/images/{image_id}     update, delete
///
/// /admin/quotes                              list (?status=)
/// /admin/quotes/counts                       per-status counts
/// /admin/quotes/{id}                         get, update (PATCH)
///
/// /admin/push-subscriptions                  register (POST), remove (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Public gallery.
        .nest("/projects", project::public_router())
        // Public quote form.
        .nest("/quotes", quote::public_router())
        // Back office.
        .nest("/admin/projects", project::admin_router())
        .nest("/admin/quotes", quote::admin_router())
        .nest("/admin/push-subscriptions", push_subscription::router())
}
