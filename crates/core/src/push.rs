//! Push notification kinds and their default payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Icon and badge shown by the browser for every admin notification.
pub const DEFAULT_ICON: &str = "/favicon.ico";

/// Deep link opened when an admin clicks a notification.
pub const ADMIN_URL: &str = "/admin";

/// Seconds a push service should hold an undelivered message.
pub const PUSH_TTL_SECS: u32 = 86_400;

/// What triggered a notification fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    NewQuote,
    DailyReminder,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::NewQuote => "new-quote",
            NotificationKind::DailyReminder => "daily-reminder",
        }
    }

    /// Urgency hint sent to the push service.
    pub fn urgency(self) -> &'static str {
        match self {
            NotificationKind::NewQuote => "high",
            NotificationKind::DailyReminder => "normal",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message delivered to a browser push subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl PushPayload {
    /// The payload sent when the caller does not supply one.
    pub fn default_for(kind: NotificationKind) -> Self {
        let (title, body) = match kind {
            NotificationKind::NewQuote => (
                "Novo pedido de orçamento",
                "Recebeu um novo pedido de orçamento. Toque para ver os detalhes.",
            ),
            NotificationKind::DailyReminder => (
                "Lembrete diário",
                "Tem pedidos de orçamento pendentes à espera de resposta.",
            ),
        };

        Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: Some(DEFAULT_ICON.to_string()),
            badge: Some(DEFAULT_ICON.to_string()),
            tag: Some(kind.as_str().to_string()),
            data: Some(serde_json::json!({ "url": ADMIN_URL })),
        }
    }
}
