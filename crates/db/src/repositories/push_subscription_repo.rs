//! Repository for the `push_subscriptions` table.

use obra_core::types::DbId;
use sqlx::PgPool;

use crate::models::push_subscription::{CreatePushSubscription, PushSubscription};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, endpoint, p256dh_key, auth_key, created_at";

/// Provides registration, lookup and pruning of push subscriptions.
pub struct PushSubscriptionRepo;

impl PushSubscriptionRepo {
    /// Register a subscription for `user_id`. Re-registering an endpoint
    /// replaces its keys and owner.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &CreatePushSubscription,
    ) -> Result<PushSubscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO push_subscriptions (user_id, endpoint, p256dh_key, auth_key)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (endpoint) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                p256dh_key = EXCLUDED.p256dh_key,
                auth_key = EXCLUDED.auth_key
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .bind(&input.endpoint)
            .bind(&input.keys.p256dh)
            .bind(&input.keys.auth)
            .fetch_one(pool)
            .await
    }

    /// All subscriptions belonging to any of `user_ids`.
    pub async fn list_for_users(
        pool: &PgPool,
        user_ids: &[DbId],
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_subscriptions
             WHERE user_id = ANY($1)
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_ids)
            .fetch_all(pool)
            .await
    }

    /// Remove a user's subscription by endpoint. Returns `true` if removed.
    pub async fn delete_by_endpoint(
        pool: &PgPool,
        user_id: DbId,
        endpoint: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM push_subscriptions WHERE user_id = $1 AND endpoint = $2")
                .bind(user_id)
                .bind(endpoint)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Batch-delete subscriptions by id. Returns the number removed.
    pub async fn delete_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
