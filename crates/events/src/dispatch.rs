//! Admin notification fan-out.
//!
//! [`NotificationDispatcher`] resolves the admin users, loads their push
//! subscriptions and delivers the payload to each one in turn. Subscriptions
//! the push service reports as gone (404/410) are deleted in one batch after
//! the loop; every other failure is logged and the subscription kept.

use std::sync::Arc;

use async_trait::async_trait;
use obra_core::push::{NotificationKind, PushPayload};
use obra_core::roles::ROLE_ADMIN;
use obra_core::types::DbId;
use obra_db::models::push_subscription::PushSubscription;
use obra_db::repositories::{PushSubscriptionRepo, UserRoleRepo};
use obra_db::DbPool;
use serde::Serialize;

use crate::delivery::web_push::{DeliveryOutcome, PushSender};

pub const MSG_NO_ADMINS: &str = "No admin users found";
pub const MSG_NO_SUBSCRIPTIONS: &str = "No subscriptions found";
pub const MSG_SENT: &str = "Notifications sent";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// PushStore
// ---------------------------------------------------------------------------

/// Storage the dispatcher reads recipients from and prunes dead
/// subscriptions in.
#[async_trait]
pub trait PushStore: Send + Sync {
    async fn admin_user_ids(&self) -> Result<Vec<DbId>, sqlx::Error>;

    async fn subscriptions_for(
        &self,
        user_ids: &[DbId],
    ) -> Result<Vec<PushSubscription>, sqlx::Error>;

    async fn delete_subscriptions(&self, ids: &[DbId]) -> Result<u64, sqlx::Error>;
}

/// [`PushStore`] backed by the `user_roles` and `push_subscriptions` tables.
pub struct PgPushStore {
    pool: DbPool,
}

impl PgPushStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PushStore for PgPushStore {
    async fn admin_user_ids(&self) -> Result<Vec<DbId>, sqlx::Error> {
        UserRoleRepo::list_user_ids_with_role(&self.pool, ROLE_ADMIN).await
    }

    async fn subscriptions_for(
        &self,
        user_ids: &[DbId],
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        PushSubscriptionRepo::list_for_users(&self.pool, user_ids).await
    }

    async fn delete_subscriptions(&self, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        PushSubscriptionRepo::delete_by_ids(&self.pool, ids).await
    }
}

// ---------------------------------------------------------------------------
// DispatchReport
// ---------------------------------------------------------------------------

/// Result of one fan-out. Serializes to the `{ message, sent }` body of the
/// dispatch endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub message: &'static str,
    pub sent: usize,
    #[serde(skip)]
    pub pruned: usize,
}

impl DispatchReport {
    fn empty(message: &'static str) -> Self {
        Self {
            message,
            sent: 0,
            pruned: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

/// Delivers admin notifications to every registered push subscription.
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn PushStore>,
    sender: Arc<dyn PushSender>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn PushStore>, sender: Arc<dyn PushSender>) -> Self {
        Self { store, sender }
    }

    /// Send a notification of `kind` to all admins.
    ///
    /// `payload` defaults to [`PushPayload::default_for`]. When `user_id` is
    /// given, only that admin's subscriptions are targeted; a non-admin id
    /// behaves like an empty admin set.
    pub async fn dispatch(
        &self,
        kind: NotificationKind,
        payload: Option<PushPayload>,
        user_id: Option<DbId>,
    ) -> Result<DispatchReport, DispatchError> {
        let mut admin_ids = self.store.admin_user_ids().await?;
        if let Some(target) = user_id {
            admin_ids.retain(|id| *id == target);
        }
        if admin_ids.is_empty() {
            tracing::info!(kind = %kind, "No admin users to notify");
            return Ok(DispatchReport::empty(MSG_NO_ADMINS));
        }

        let subscriptions = self.store.subscriptions_for(&admin_ids).await?;
        if subscriptions.is_empty() {
            tracing::info!(kind = %kind, admins = admin_ids.len(), "No push subscriptions");
            return Ok(DispatchReport::empty(MSG_NO_SUBSCRIPTIONS));
        }

        let payload = payload.unwrap_or_else(|| PushPayload::default_for(kind));
        let mut sent = 0;
        let mut gone: Vec<DbId> = Vec::new();

        for subscription in &subscriptions {
            match self.sender.send(subscription, &payload, kind).await {
                Ok(status) => match DeliveryOutcome::from_status(status) {
                    DeliveryOutcome::Sent => sent += 1,
                    DeliveryOutcome::Gone => {
                        tracing::info!(
                            subscription_id = %subscription.id,
                            status,
                            "Push subscription expired, scheduling removal"
                        );
                        gone.push(subscription.id);
                    }
                    DeliveryOutcome::Rejected(status) => {
                        tracing::warn!(
                            subscription_id = %subscription.id,
                            status,
                            "Push service rejected notification"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Push delivery failed"
                    );
                }
            }
        }

        let pruned = if gone.is_empty() {
            0
        } else {
            match self.store.delete_subscriptions(&gone).await {
                Ok(n) => n as usize,
                Err(e) => {
                    tracing::error!(error = %e, count = gone.len(), "Failed to prune push subscriptions");
                    0
                }
            }
        };

        tracing::info!(
            kind = %kind,
            sent,
            pruned,
            total = subscriptions.len(),
            "Push notifications dispatched"
        );

        Ok(DispatchReport {
            message: MSG_SENT,
            sent,
            pruned,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
