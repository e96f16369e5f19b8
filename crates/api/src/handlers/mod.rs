//! Request handlers.
//!
//! Handlers delegate to the repositories in `obra_db`, the gallery feed or
//! the notification dispatcher, and map errors via [`AppError`](crate::error::AppError).

pub mod functions;
pub mod project;
pub mod push_subscription;
pub mod quote;
