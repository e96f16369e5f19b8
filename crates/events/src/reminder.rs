//! Daily reminder scheduler.
//!
//! [`ReminderScheduler`] runs as a background task and, once per interval,
//! notifies admins when quote requests are still waiting in `pending`.

use std::time::Duration;

use obra_core::push::NotificationKind;
use obra_core::quote_status::QuoteStatus;
use obra_db::repositories::QuoteRequestRepo;
use obra_db::DbPool;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::dispatch::{DispatchError, NotificationDispatcher};

/// Default time between reminders.
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(24 * 3600);

// ---------------------------------------------------------------------------
// ReminderScheduler
// ---------------------------------------------------------------------------

/// Background service that reminds admins about pending quote requests.
pub struct ReminderScheduler {
    pool: DbPool,
    dispatcher: NotificationDispatcher,
    period: Duration,
}

impl ReminderScheduler {
    pub fn new(pool: DbPool, dispatcher: NotificationDispatcher, period: Duration) -> Self {
        Self {
            pool,
            dispatcher,
            period,
        }
    }

    /// Run the reminder loop.
    ///
    /// The first check happens one full period after start, so restarts do
    /// not re-send the reminder. Exits when `cancel` is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Reminder scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.send_reminder().await {
                        tracing::error!(error = %e, "Failed to send daily reminder");
                    }
                }
            }
        }
    }

    /// Dispatch a reminder if any quote request is pending.
    async fn send_reminder(&self) -> Result<(), DispatchError> {
        let pending = QuoteRequestRepo::count_with_status(&self.pool, QuoteStatus::Pending).await?;
        if pending == 0 {
            tracing::debug!("No pending quote requests, skipping reminder");
            return Ok(());
        }

        let report = self
            .dispatcher
            .dispatch(NotificationKind::DailyReminder, None, None)
            .await?;
        tracing::info!(pending, sent = report.sent, "Daily reminder dispatched");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
