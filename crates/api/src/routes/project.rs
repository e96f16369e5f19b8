//! Route definitions for the gallery and the project back office.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /           -> list_gallery
/// POST   /refresh    -> refresh_gallery (admin)
/// ```
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list_gallery))
        .route("/refresh", post(project::refresh_gallery))
}

/// Routes mounted at `/admin/projects`.
///
/// ```text
/// GET    /                               -> list_projects
/// POST   /                               -> create_project
/// GET    /{id}                           -> get_project
/// PUT    /{id}                           -> update_project
/// DELETE /{id}                           -> delete_project
///
/// GET    /{id}/images                    -> list_images
/// POST   /{id}/images                    -> add_image
/// PUT    /{id}/images/order              -> reorder_images
/// PUT    /{id}/images/{image_id}         -> update_image
/// DELETE /{id}/images/{image_id}         -> delete_image
/// ```
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list_projects).post(project::create_project))
        .route(
            "/{id}",
            get(project::get_project)
                .put(project::update_project)
                .delete(project::delete_project),
        )
        .route(
            "/{id}/images",
            get(project::list_images).post(project::add_image),
        )
        .route("/{id}/images/order", put(project::reorder_images))
        .route(
            "/{id}/images/{image_id}",
            put(project::update_image).delete(project::delete_image),
        )
}
