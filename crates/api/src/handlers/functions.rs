//! The push notification function.
//!
//! A single POST endpoint with two behaviors picked from the body:
//!
//! - `{"action": "get-vapid-key"}` returns the public VAPID key browsers
//!   need to subscribe;
//! - `{"type": "new-quote" | "daily-reminder", "payload"?, "userId"?}` fans a
//!   notification out to the admins' push subscriptions.
//!
//! Every response, errors included, carries permissive CORS headers so the
//! endpoint can be called from any origin.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN};
use axum::http::HeaderValue;
use axum::response::Response;
use axum::Json;
use obra_core::push::{NotificationKind, PushPayload};
use obra_core::types::DbId;
use serde::Deserialize;
use serde_json::json;

use crate::error::FunctionError;
use crate::state::AppState;

/// Value of the `action` field that requests the public VAPID key.
pub const ACTION_GET_VAPID_KEY: &str = "get-vapid-key";

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Raw request body. Every field is optional; the handler decides which
/// shape was sent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionRequest {
    action: Option<String>,
    #[serde(rename = "type")]
    kind: Option<NotificationKind>,
    payload: Option<PushPayload>,
    user_id: Option<DbId>,
}

/// POST /functions/v1/send-push-notification
pub async fn send_push_notification(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, FunctionError> {
    let request: FunctionRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Unparseable push function request");
        FunctionError::InvalidRequest
    })?;

    if request.action.as_deref() == Some(ACTION_GET_VAPID_KEY) {
        return Ok(Json(json!({
            "vapidPublicKey": state.config.vapid.public_key,
        })));
    }

    let Some(kind) = request.kind else {
        return Err(FunctionError::InvalidRequest);
    };

    let report = state
        .dispatcher
        .dispatch(kind, request.payload, request.user_id)
        .await
        .map_err(|e| FunctionError::Internal(e.to_string()))?;

    Ok(Json(json!(report)))
}

/// OPTIONS /functions/v1/send-push-notification
pub async fn preflight() -> &'static str {
    "ok"
}

/// Response mapper adding the function's CORS headers.
pub async fn with_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}
