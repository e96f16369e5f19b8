//! Obra admin notification infrastructure.
//!
//! - [`delivery`]: Web Push delivery signed with VAPID.
//! - [`NotificationDispatcher`]: fans a notification out to every admin
//!   push subscription and prunes subscriptions the push service reports
//!   as gone.
//! - [`ReminderScheduler`]: periodic reminder about pending quote requests.

pub mod delivery;
pub mod dispatch;
pub mod reminder;

pub use delivery::web_push::{PushError, PushSender, VapidConfig, VapidSigner, WebPushDelivery};
pub use dispatch::{DispatchError, DispatchReport, NotificationDispatcher, PgPushStore, PushStore};
pub use reminder::ReminderScheduler;
