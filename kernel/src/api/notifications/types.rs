//! Request/Response Types for the notification API.

use serde::{Deserialize, Serialize};

use crate::notify::DispatchResult;

/// Body of `POST /api/notifications/whatsapp`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationRequest {
    /// Template with `{name}`, `{balance}`, `{month}`, `{year}`, `{duration}`.
    #[serde(default)]
    pub message_template: Option<String>,
    /// 1-based month; defaults to the current month.
    #[serde(default)]
    pub month: Option<u32>,
    /// Defaults to the current year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Text substituted for `{duration}`.
    #[serde(default)]
    pub duration: Option<String>,
    /// Attach the monthly statement as a second message.
    #[serde(default)]
    pub include_transactions: bool,
}

/// Per-batch counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationDetails {
    /// Recipients that got every message.
    pub success_count: usize,
    /// Recipients with at least one failure.
    pub fail_count: usize,
    /// `"<name> (<reason>)"` for each failure.
    pub failed_users: Vec<String>,
}

/// Response of `POST /api/notifications/whatsapp`.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    /// `true` once the batch ran, even if some recipients failed.
    pub success: bool,
    /// Human readable summary.
    pub message: String,
    /// Counters.
    pub details: NotificationDetails,
}

impl From<DispatchResult> for NotificationResponse {
    fn from(result: DispatchResult) -> Self {
        let message = format!(
            "Notifications sent to {} of {} recipients",
            result.success_count,
            result.total()
        );
        Self {
            success: true,
            message,
            details: NotificationDetails {
                success_count: result.success_count,
                fail_count: result.fail_count,
                failed_users: result.failed_users(),
            },
        }
    }
}
