//! Repository for the `user_roles` table.

use obra_core::types::DbId;
use sqlx::PgPool;

/// Read-only access to role assignments.
pub struct UserRoleRepo;

impl UserRoleRepo {
    /// All user ids holding `role`.
    pub async fn list_user_ids_with_role(
        pool: &PgPool,
        role: &str,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT DISTINCT user_id FROM user_roles WHERE role = $1")
            .bind(role)
            .fetch_all(pool)
            .await
    }

    /// Whether `user_id` holds `role`.
    pub async fn has_role(pool: &PgPool, user_id: DbId, role: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
        )
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }
}
