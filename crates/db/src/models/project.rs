//! Project entity model and DTOs.

use obra_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::project_image::ProjectImage;

/// Status value of projects shown on the public site.
pub const STATUS_ACTIVE: &str = "active";

/// A project row from the `projects` table.
///
/// Date fields are free text: the back office accepts both ISO dates and
/// descriptions such as "2.º trimestre 2025".
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: DbId,
    pub title: String,
    pub category: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub delivery_date: Option<String>,
    pub completion_deadline: Option<String>,
    pub status: String,
    pub client_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A project joined with all of its images, as returned by
/// [`ProjectRepo::list_active_with_images`](crate::repositories::ProjectRepo::list_active_with_images).
#[derive(Debug, Clone, FromRow)]
pub struct ProjectImagesRow {
    #[sqlx(flatten)]
    pub project: Project,
    pub images: Json<Vec<ProjectImage>>,
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub category: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub delivery_date: Option<String>,
    pub completion_deadline: Option<String>,
    /// Defaults to `active` if omitted.
    pub status: Option<String>,
    pub client_name: Option<String>,
}

/// DTO for updating an existing project. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub delivery_date: Option<String>,
    pub completion_deadline: Option<String>,
    pub status: Option<String>,
    pub client_name: Option<String>,
}
