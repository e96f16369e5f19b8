//! Handlers for admin push subscription registration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use obra_core::error::CoreError;
use obra_db::models::push_subscription::CreatePushSubscription;
use obra_db::repositories::PushSubscriptionRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `DELETE /admin/push-subscriptions`.
#[derive(Debug, Deserialize)]
pub struct Unsubscribe {
    pub endpoint: String,
}

/// POST /api/v1/admin/push-subscriptions
///
/// Register the browser subscription of the calling admin. Re-registering
/// an endpoint replaces its keys.
pub async fn subscribe(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreatePushSubscription>,
) -> AppResult<impl IntoResponse> {
    if !input.endpoint.starts_with("https://") {
        return Err(AppError::Core(CoreError::Validation(
            "endpoint must be an https URL".into(),
        )));
    }
    if input.keys.p256dh.is_empty() || input.keys.auth.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "keys.p256dh and keys.auth are required".into(),
        )));
    }

    let subscription = PushSubscriptionRepo::upsert(&state.pool, admin.user_id, &input).await?;
    tracing::info!(
        user_id = %admin.user_id,
        subscription_id = %subscription.id,
        "Push subscription registered"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: subscription })))
}

/// DELETE /api/v1/admin/push-subscriptions
pub async fn unsubscribe(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<Unsubscribe>,
) -> AppResult<StatusCode> {
    if !PushSubscriptionRepo::delete_by_endpoint(&state.pool, admin.user_id, &input.endpoint).await?
    {
        return Err(AppError::BadRequest(
            "No subscription registered for this endpoint".into(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}
