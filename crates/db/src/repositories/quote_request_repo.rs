//! Repository for the `quote_requests` table.

use obra_core::quote_status::QuoteStatus;
use obra_core::types::DbId;
use sqlx::PgPool;

use crate::models::quote_request::{
    CreateQuoteRequest, QuoteRequest, QuoteStatusCount, UpdateQuoteRequest,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, email, phone, project_type, service, message, description, \
    status, internal_notes, gdpr_consent, documents_link, created_at, updated_at";

/// Provides create, triage and reporting operations for quote requests.
/// Quote requests are never deleted.
pub struct QuoteRequestRepo;

impl QuoteRequestRepo {
    /// Insert a new request with status `pending`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateQuoteRequest,
    ) -> Result<QuoteRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO quote_requests (name, email, phone, project_type, service, message,
                 description, status, gdpr_consent, documents_link)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.project_type)
            .bind(&input.service)
            .bind(&input.message)
            .bind(&input.description)
            .bind(QuoteStatus::Pending.as_str())
            .bind(input.gdpr_consent)
            .bind(&input.documents_link)
            .fetch_one(pool)
            .await
    }

    /// Find a request by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QuoteRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quote_requests WHERE id = $1");
        sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requests newest first, optionally restricted to one status.
    pub async fn list(
        pool: &PgPool,
        status: Option<QuoteStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QuoteRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM quote_requests
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(status.map(QuoteStatus::as_str))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Apply a triage edit. Only non-`None` fields are written.
    ///
    /// Callers validate the status transition before calling this and pass
    /// the status it was validated from as `expected_status`. The row is only
    /// written while it still holds that status, so of two concurrent edits
    /// from the same status at most one applies. Returns `None` when the row
    /// is missing or its status no longer matches.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateQuoteRequest,
        expected_status: Option<QuoteStatus>,
    ) -> Result<Option<QuoteRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE quote_requests SET
                status = COALESCE($2, status),
                internal_notes = COALESCE($3, internal_notes),
                updated_at = NOW()
             WHERE id = $1 AND ($4::TEXT IS NULL OR status = $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuoteRequest>(&query)
            .bind(id)
            .bind(&input.status)
            .bind(&input.internal_notes)
            .bind(expected_status.map(QuoteStatus::as_str))
            .fetch_optional(pool)
            .await
    }

    /// Number of requests currently in `status`.
    pub async fn count_with_status(pool: &PgPool, status: QuoteStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM quote_requests WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(pool)
            .await
    }

    /// Request counts grouped by status, for the admin dashboard.
    pub async fn count_by_status(pool: &PgPool) -> Result<Vec<QuoteStatusCount>, sqlx::Error> {
        sqlx::query_as::<_, QuoteStatusCount>(
            "SELECT status, COUNT(*) AS count FROM quote_requests GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }
}
