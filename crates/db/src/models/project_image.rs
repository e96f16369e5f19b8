//! Project image entity model and DTOs.

use obra_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `project_images` table.
///
/// Display order is `position` ascending, ties broken by `created_at`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProjectImage {
    pub id: DbId,
    pub project_id: DbId,
    pub url: String,
    pub caption: Option<String>,
    pub image_date: Option<String>,
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering an uploaded image. The image is appended after the
/// project's current last position.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectImage {
    pub url: String,
    pub caption: Option<String>,
    pub image_date: Option<String>,
}

/// DTO for editing image metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectImage {
    pub caption: Option<String>,
    pub image_date: Option<String>,
}
