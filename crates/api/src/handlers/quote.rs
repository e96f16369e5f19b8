//! Handlers for quote requests: public submission and admin triage.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use obra_core::error::CoreError;
use obra_core::push::NotificationKind;
use obra_core::quote_status::{validate_transition, QuoteStatus};
use obra_core::types::DbId;
use obra_db::models::quote_request::{CreateQuoteRequest, UpdateQuoteRequest};
use obra_db::repositories::QuoteRequestRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for quote listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for quote listing.
const DEFAULT_LIMIT: i64 = 50;

/// Query parameters for `GET /admin/quotes`.
#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn parse_status(value: &str) -> AppResult<QuoteStatus> {
    value
        .parse::<QuoteStatus>()
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))
}

// ---------------------------------------------------------------------------
// Public submission
// ---------------------------------------------------------------------------

/// POST /api/v1/quotes
///
/// Store a quote request from the public form and notify the admins in the
/// background. A failed notification never fails the submission.
pub async fn submit_quote(
    State(state): State<AppState>,
    Json(input): Json<CreateQuoteRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if !input.gdpr_consent {
        return Err(AppError::Core(CoreError::Validation(
            "Consent to data processing is required".into(),
        )));
    }

    let quote = QuoteRequestRepo::create(&state.pool, &input).await?;
    tracing::info!(quote_id = %quote.id, "Quote request received");

    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        if let Err(e) = dispatcher
            .dispatch(NotificationKind::NewQuote, None, None)
            .await
        {
            tracing::error!(error = %e, "Failed to notify admins of new quote request");
        }
    });

    Ok((StatusCode::CREATED, Json(DataResponse { data: quote })))
}

// ---------------------------------------------------------------------------
// Admin triage
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/quotes
///
/// Newest first, optionally filtered by `status`.
pub async fn list_quotes(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<QuoteQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let status = params.status.as_deref().map(parse_status).transpose()?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let quotes = QuoteRequestRepo::list(&state.pool, status, limit, offset).await?;
    Ok(Json(serde_json::json!({ "data": quotes })))
}

/// GET /api/v1/admin/quotes/counts
///
/// Number of requests per status, for the dashboard badges.
pub async fn count_quotes(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let counts = QuoteRequestRepo::count_by_status(&state.pool).await?;
    Ok(Json(serde_json::json!({ "data": counts })))
}

/// GET /api/v1/admin/quotes/{id}
pub async fn get_quote(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let quote = QuoteRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::not_found("QuoteRequest", id))?;
    Ok(Json(serde_json::json!({ "data": quote })))
}

/// PATCH /api/v1/admin/quotes/{id}
///
/// Update status and/or internal notes. Status changes must follow the
/// quote status graph and fail with 409 if another edit changed the status
/// first.
pub async fn update_quote(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateQuoteRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let current = QuoteRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::not_found("QuoteRequest", id))?;

    let expected_status = match input.status.as_deref() {
        Some(next) => {
            let next = parse_status(next)?;
            let from = current
                .status
                .parse::<QuoteStatus>()
                .map_err(AppError::InternalError)?;
            validate_transition(from, next)
                .map_err(|msg| AppError::Core(CoreError::Conflict(msg)))?;
            Some(from)
        }
        None => None,
    };

    let updated = QuoteRequestRepo::update(&state.pool, id, &input, expected_status)
        .await?
        .ok_or_else(|| match expected_status {
            Some(from) => CoreError::Conflict(format!(
                "Quote request {id} is no longer '{from}'"
            )),
            None => CoreError::not_found("QuoteRequest", id),
        })?;
    tracing::info!(
        quote_id = %id,
        user_id = %admin.user_id,
        status = %updated.status,
        "Quote request updated"
    );

    Ok(Json(serde_json::json!({ "data": updated })))
}
