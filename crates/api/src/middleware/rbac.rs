//! Role-based access control extractors.
//!
//! Roles live in the `user_roles` table rather than in the token, so the
//! check costs one query per admin request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use obra_core::error::CoreError;
use obra_core::roles::ROLE_ADMIN;
use obra_db::repositories::UserRoleRepo;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !UserRoleRepo::has_role(&state.pool, user.user_id, ROLE_ADMIN).await? {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}
