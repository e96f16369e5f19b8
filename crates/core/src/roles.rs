//! Well-known role name constants.
//!
//! These must match the values stored in `user_roles.role`.

/// The only role the back office consumes. Admins see the admin screens
/// and receive push notifications.
pub const ROLE_ADMIN: &str = "admin";
