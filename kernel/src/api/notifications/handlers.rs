//! Handlers for bulk notifications.

use axum::extract::{Json, State};
use tracing::info;

use crate::api::error::ApiError;
use crate::api::notifications::types::{NotificationRequest, NotificationResponse};
use crate::directory::Period;
use crate::notify::{DispatchContext, NotificationJob};
use crate::state::AppState;

/// POST /api/notifications/whatsapp
///
/// Sends the rendered template to every user in the directory.
pub async fn send_whatsapp_notifications(
    State(state): State<AppState>,
    Json(req): Json<NotificationRequest>,
) -> Result<Json<NotificationResponse>, ApiError> {
    // Fail fast before touching the directory.
    state.sessions.active_session()?;

    if let Some(month) = req.month {
        if !(1..=12).contains(&month) {
            return Err(ApiError::ValidationError(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
    }

    let current = Period::current();
    let period = Period::new(
        req.month.unwrap_or(current.month()),
        req.year.unwrap_or(current.year()),
    );
    let template = req
        .message_template
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| state.dispatch.default_template.clone());

    let recipients = state.directory.recipients().await?;
    info!(
        recipients = recipients.len(),
        month = period.month(),
        year = period.year(),
        include_transactions = req.include_transactions,
        "Notification batch requested"
    );

    let job = NotificationJob {
        recipients,
        template,
    };
    let context = DispatchContext {
        period,
        duration: req.duration,
        include_statement: req.include_transactions,
    };

    // The batch keeps running if the caller goes away.
    let result = state
        .dispatcher
        .spawn_dispatch(job, context)
        .await
        .map_err(|e| ApiError::Internal(format!("dispatch task failed: {e}")))??;

    Ok(Json(result.into()))
}
