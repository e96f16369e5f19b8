//! Browser push subscription model and DTOs.

use obra_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `push_subscriptions` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PushSubscription {
    pub id: DbId,
    pub user_id: DbId,
    pub endpoint: String,
    pub p256dh_key: String,
    pub auth_key: String,
    pub created_at: Timestamp,
}

/// Encryption keys of a browser `PushSubscription`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// DTO matching the JSON form of a browser `PushSubscription`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}
