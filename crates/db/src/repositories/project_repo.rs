//! Repository for the `projects` table.

use obra_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, ProjectImagesRow, UpdateProject, STATUS_ACTIVE};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, category, city, description, cover_image, \
    start_date, end_date, delivery_date, completion_deadline, status, client_name, \
    created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    ///
    /// If `status` is `None` in the input, defaults to `active`.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (title, category, city, description, cover_image,
                 start_date, end_date, delivery_date, completion_deadline, status, client_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, '{STATUS_ACTIVE}'), $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.title)
            .bind(&input.category)
            .bind(&input.city)
            .bind(&input.description)
            .bind(&input.cover_image)
            .bind(&input.start_date)
            .bind(&input.end_date)
            .bind(&input.delivery_date)
            .bind(&input.completion_deadline)
            .bind(&input.status)
            .bind(&input.client_name)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all projects, any status, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC");
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// List active projects together with their images in one round trip.
    ///
    /// Projects without images are included with an empty list; the gallery
    /// feed decides what to show.
    pub async fn list_active_with_images(
        pool: &PgPool,
    ) -> Result<Vec<ProjectImagesRow>, sqlx::Error> {
        let query = format!(
            "SELECT {cols},
                    COALESCE(
                        json_agg(i ORDER BY i.position, i.created_at)
                            FILTER (WHERE i.id IS NOT NULL),
                        '[]'::json
                    ) AS images
             FROM projects p
             LEFT JOIN project_images i ON i.project_id = p.id
             WHERE p.status = $1
             GROUP BY p.id
             ORDER BY p.created_at DESC",
            cols = prefixed_columns("p"),
        );
        sqlx::query_as::<_, ProjectImagesRow>(&query)
            .bind(STATUS_ACTIVE)
            .fetch_all(pool)
            .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                title = COALESCE($2, title),
                category = COALESCE($3, category),
                city = COALESCE($4, city),
                description = COALESCE($5, description),
                cover_image = COALESCE($6, cover_image),
                start_date = COALESCE($7, start_date),
                end_date = COALESCE($8, end_date),
                delivery_date = COALESCE($9, delivery_date),
                completion_deadline = COALESCE($10, completion_deadline),
                status = COALESCE($11, status),
                client_name = COALESCE($12, client_name),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.category)
            .bind(&input.city)
            .bind(&input.description)
            .bind(&input.cover_image)
            .bind(&input.start_date)
            .bind(&input.end_date)
            .bind(&input.delivery_date)
            .bind(&input.completion_deadline)
            .bind(&input.status)
            .bind(&input.client_name)
            .fetch_optional(pool)
            .await
    }

    /// Delete a project and (by cascade) its images. Returns `true` if a row
    /// was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// `COLUMNS` qualified with a table alias, for joins.
fn prefixed_columns(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
