//! Repository for the `project_images` table.

use obra_core::types::DbId;
use sqlx::PgPool;

use crate::models::project_image::{CreateProjectImage, ProjectImage, UpdateProjectImage};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, project_id, url, caption, image_date, position, created_at, updated_at";

/// Provides CRUD and ordering operations for project images.
pub struct ProjectImageRepo;

impl ProjectImageRepo {
    /// Append an image after the project's current last position.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        input: &CreateProjectImage,
    ) -> Result<ProjectImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_images (project_id, url, caption, image_date, position)
             VALUES ($1, $2, $3, $4,
                     (SELECT COALESCE(MAX(position) + 1, 0)
                      FROM project_images WHERE project_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectImage>(&query)
            .bind(project_id)
            .bind(&input.url)
            .bind(&input.caption)
            .bind(&input.image_date)
            .fetch_one(pool)
            .await
    }

    /// Find an image by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ProjectImage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_images WHERE id = $1");
        sqlx::query_as::<_, ProjectImage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's images in display order.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<ProjectImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_images
             WHERE project_id = $1
             ORDER BY position ASC, created_at ASC"
        );
        sqlx::query_as::<_, ProjectImage>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Update image metadata. Returns `None` if the image does not belong to
    /// `project_id`.
    pub async fn update(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
        input: &UpdateProjectImage,
    ) -> Result<Option<ProjectImage>, sqlx::Error> {
        let query = format!(
            "UPDATE project_images SET
                caption = COALESCE($3, caption),
                image_date = COALESCE($4, image_date),
                updated_at = NOW()
             WHERE id = $1 AND project_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectImage>(&query)
            .bind(id)
            .bind(project_id)
            .bind(&input.caption)
            .bind(&input.image_date)
            .fetch_optional(pool)
            .await
    }

    /// Delete an image, returning the removed row so the caller can clean up
    /// the stored object.
    pub async fn delete(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<ProjectImage>, sqlx::Error> {
        let query = format!(
            "DELETE FROM project_images WHERE id = $1 AND project_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectImage>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// Rewrite `position` so the images appear in `ordered_ids` order.
    ///
    /// Runs in one transaction. Returns `false` (and changes nothing) if the
    /// ids are not exactly the project's image set.
    pub async fn reorder(
        pool: &PgPool,
        project_id: DbId,
        ordered_ids: &[DbId],
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM project_images WHERE project_id = $1 FOR UPDATE",
        )
        .bind(project_id)
        .fetch_all(&mut *tx)
        .await?;

        if !same_id_set(&existing, ordered_ids) {
            tx.rollback().await?;
            return Ok(false);
        }

        for (position, id) in ordered_ids.iter().enumerate() {
            sqlx::query(
                "UPDATE project_images SET position = $3
                 WHERE id = $1 AND project_id = $2",
            )
            .bind(id)
            .bind(project_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

/// Whether `requested` is a permutation of `existing`.
fn same_id_set(existing: &[DbId], requested: &[DbId]) -> bool {
    if existing.len() != requested.len() {
        return false;
    }
    let mut a = existing.to_vec();
    let mut b = requested.to_vec();
    a.sort();
    b.sort();
    a == b
}
