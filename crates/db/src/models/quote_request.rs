//! Quote request entity model and DTOs.

use obra_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `quote_requests` table.
///
/// `status` holds one of the [`QuoteStatus`](obra_core::quote_status::QuoteStatus)
/// names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuoteRequest {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub project_type: Option<String>,
    pub service: Option<String>,
    pub message: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub internal_notes: Option<String>,
    pub gdpr_consent: bool,
    pub documents_link: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO submitted by the public quote form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub project_type: Option<String>,
    pub service: Option<String>,
    #[validate(length(max = 5000))]
    pub message: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    pub gdpr_consent: bool,
    #[validate(url(message = "documents_link must be a URL"))]
    pub documents_link: Option<String>,
}

/// DTO for admin triage edits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuoteRequest {
    pub status: Option<String>,
    pub internal_notes: Option<String>,
}

/// Number of quote requests per status.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuoteStatusCount {
    pub status: String,
    pub count: i64,
}
