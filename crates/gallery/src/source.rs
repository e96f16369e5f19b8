//! Where the feed loads projects from.

use async_trait::async_trait;
use obra_db::repositories::ProjectRepo;
use obra_db::DbPool;

use crate::transform::RawProject;

/// Loads active projects joined with their images in one round trip.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    async fn fetch_active_with_images(&self) -> Result<Vec<RawProject>, sqlx::Error>;
}

/// [`ProjectSource`] over the `projects` / `project_images` tables.
pub struct PgProjectSource {
    pool: DbPool,
}

impl PgProjectSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectSource for PgProjectSource {
    async fn fetch_active_with_images(&self) -> Result<Vec<RawProject>, sqlx::Error> {
        let rows = ProjectRepo::list_active_with_images(&self.pool).await?;
        Ok(rows.into_iter().map(RawProject::from).collect())
    }
}
