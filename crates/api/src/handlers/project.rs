//! Handlers for the public gallery and project administration.
//!
//! Every project or image mutation schedules a background refresh of the
//! gallery feed so the public list catches up without waiting for the cache
//! to expire.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use obra_core::error::CoreError;
use obra_core::types::DbId;
use obra_db::models::project::{CreateProject, UpdateProject};
use obra_db::models::project_image::{CreateProjectImage, UpdateProjectImage};
use obra_db::repositories::{ProjectImageRepo, ProjectRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PUT /admin/projects/{id}/images/order`.
#[derive(Debug, Deserialize)]
pub struct ReorderImages {
    pub image_ids: Vec<DbId>,
}

/// Reload the gallery feed in the background.
fn schedule_feed_refresh(state: &AppState) {
    let feed = state.feed.clone();
    tokio::spawn(async move {
        // Failures are recorded in the feed state and logged there.
        let _ = feed.refresh_projects().await;
    });
}

async fn ensure_project_exists(state: &AppState, id: DbId) -> AppResult<()> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Project", id))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Public gallery
// ---------------------------------------------------------------------------

/// GET /api/v1/projects
///
/// The gallery feed: active projects with at least one image.
pub async fn list_gallery(State(state): State<AppState>) -> impl IntoResponse {
    Json(DataResponse {
        data: state.feed.snapshot().await,
    })
}

/// POST /api/v1/projects/refresh
///
/// Reload the feed from the database, bypassing the cache. A failed reload
/// keeps the previous projects and reports the failure in `error`.
pub async fn refresh_gallery(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> impl IntoResponse {
    tracing::info!(user_id = %admin.user_id, "Gallery refresh requested");
    let _ = state.feed.refresh_projects().await;
    Json(DataResponse {
        data: state.feed.snapshot().await,
    })
}

// ---------------------------------------------------------------------------
// Project admin
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/projects
pub async fn list_projects(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let projects = ProjectRepo::list(&state.pool).await?;
    Ok(Json(serde_json::json!({ "data": projects })))
}

/// POST /api/v1/admin/projects
pub async fn create_project(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> AppResult<impl IntoResponse> {
    if input.title.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "title is required".into(),
        )));
    }

    let project = ProjectRepo::create(&state.pool, &input).await?;
    tracing::info!(project_id = %project.id, user_id = %admin.user_id, "Project created");
    schedule_feed_refresh(&state);

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/admin/projects/{id}
pub async fn get_project(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Project", id))?;
    let images = ProjectImageRepo::list_for_project(&state.pool, id).await?;

    Ok(Json(serde_json::json!({
        "data": { "project": project, "images": images }
    })))
}

/// PUT /api/v1/admin/projects/{id}
pub async fn update_project(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<serde_json::Value>> {
    if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "title must not be empty".into(),
        )));
    }

    let project = ProjectRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| CoreError::not_found("Project", id))?;
    schedule_feed_refresh(&state);

    Ok(Json(serde_json::json!({ "data": project })))
}

/// DELETE /api/v1/admin/projects/{id}
///
/// Images are removed with the project.
pub async fn delete_project(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ProjectRepo::delete(&state.pool, id).await? {
        return Err(CoreError::not_found("Project", id).into());
    }
    tracing::info!(project_id = %id, user_id = %admin.user_id, "Project deleted");
    schedule_feed_refresh(&state);

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/projects/{id}/images
pub async fn list_images(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    ensure_project_exists(&state, project_id).await?;
    let images = ProjectImageRepo::list_for_project(&state.pool, project_id).await?;
    Ok(Json(serde_json::json!({ "data": images })))
}

/// POST /api/v1/admin/projects/{id}/images
///
/// Registers an already-uploaded image by URL, appended after the last one.
pub async fn add_image(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateProjectImage>,
) -> AppResult<impl IntoResponse> {
    if input.url.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation("url is required".into())));
    }
    ensure_project_exists(&state, project_id).await?;

    let image = ProjectImageRepo::create(&state.pool, project_id, &input).await?;
    schedule_feed_refresh(&state);

    Ok((StatusCode::CREATED, Json(DataResponse { data: image })))
}

/// PUT /api/v1/admin/projects/{id}/images/{image_id}
pub async fn update_image(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((project_id, image_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateProjectImage>,
) -> AppResult<Json<serde_json::Value>> {
    let image = ProjectImageRepo::update(&state.pool, project_id, image_id, &input)
        .await?
        .ok_or_else(|| CoreError::not_found("ProjectImage", image_id))?;
    schedule_feed_refresh(&state);

    Ok(Json(serde_json::json!({ "data": image })))
}

/// DELETE /api/v1/admin/projects/{id}/images/{image_id}
pub async fn delete_image(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((project_id, image_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let removed = ProjectImageRepo::delete(&state.pool, project_id, image_id)
        .await?
        .ok_or_else(|| CoreError::not_found("ProjectImage", image_id))?;
    tracing::info!(image_id = %removed.id, url = %removed.url, "Project image deleted");
    schedule_feed_refresh(&state);

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/projects/{id}/images/order
///
/// `image_ids` must list every image of the project exactly once, in the
/// desired display order.
pub async fn reorder_images(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<ReorderImages>,
) -> AppResult<Json<serde_json::Value>> {
    ensure_project_exists(&state, project_id).await?;

    if !ProjectImageRepo::reorder(&state.pool, project_id, &input.image_ids).await? {
        return Err(AppError::Core(CoreError::Validation(
            "image_ids must list every image of the project exactly once".into(),
        )));
    }
    let images = ProjectImageRepo::list_for_project(&state.pool, project_id).await?;
    schedule_feed_refresh(&state);

    Ok(Json(serde_json::json!({ "data": images })))
}
