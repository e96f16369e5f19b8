//! Domain building blocks shared by every Obra crate.
//!
//! - [`cache`] -- TTL key-value persistence with cross-handle change
//!   notification.
//! - [`retry`] -- bounded retry with exponential backoff.
//! - [`client_name`] -- client identity extraction from project descriptions.
//! - [`quote_status`] -- quote request status graph.
//! - [`push`] -- push notification kinds and default payloads.

pub mod cache;
pub mod client_name;
pub mod error;
pub mod push;
pub mod quote_status;
pub mod retry;
pub mod roles;
pub mod types;
