//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod project_image_repo;
pub mod project_repo;
pub mod push_subscription_repo;
pub mod quote_request_repo;
pub mod user_role_repo;

pub use project_image_repo::ProjectImageRepo;
pub use project_repo::ProjectRepo;
pub use push_subscription_repo::PushSubscriptionRepo;
pub use quote_request_repo::QuoteRequestRepo;
pub use user_role_repo::UserRoleRepo;
