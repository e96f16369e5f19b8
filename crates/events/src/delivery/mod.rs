//! External delivery channels for admin notifications.
//!
//! Only browser Web Push is supported; each delivery is a single signed
//! HTTP POST to the subscription's push service endpoint.

pub mod web_push;
