//! Bulk notification dispatch through the active messaging session.
//!
//! A batch is strictly sequential: recipients are visited in input order and
//! the rate gate is awaited between two sends. Per-recipient failures are
//! collected into the result; only a missing session aborts the whole batch,
//! and it does so before any recipient is touched.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::directory::{Period, Recipient, RecipientDirectory};
use crate::infrastructure::audit::{self, AuditEvent};
use crate::notify::address::normalize_phone;
use crate::notify::rate::RateGate;
use crate::notify::statement::HistoryRenderer;
use crate::notify::template::{render, TemplateValues};
use crate::session::{MessagingSession, SessionError, SessionLifecycle};

/// Reason recorded for recipients without a phone number.
pub const NO_PHONE: &str = "no phone number";
/// Reason recorded for phone numbers that cannot be turned into an address.
pub const INVALID_PHONE: &str = "invalid phone number";

/// Errors that abort a dispatch before it starts.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No connected messaging session.
    #[error(transparent)]
    SessionUnavailable(#[from] SessionError),
}

/// One batch: who receives what.
#[derive(Debug, Clone)]
pub struct NotificationJob {
    /// Recipients in send order.
    pub recipients: Vec<Recipient>,
    /// Message template with named placeholders.
    pub template: String,
}

/// Per-batch values shared by every recipient.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// Month the message is about.
    pub period: Period,
    /// Overrides `{duration}`; defaults to `"<month> <year>"`.
    pub duration: Option<String>,
    /// Send the monthly statement as a second message.
    pub include_statement: bool,
}

impl DispatchContext {
    /// Context for `period` without attachments.
    #[must_use]
    pub fn new(period: Period) -> Self {
        Self {
            period,
            duration: None,
            include_statement: false,
        }
    }
}

/// A recipient that did not get a complete notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecipient {
    /// Display name.
    pub name: String,
    /// Human readable reason.
    pub reason: String,
}

impl fmt::Display for FailedRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.reason)
    }
}

/// Aggregate outcome of a batch.
///
/// `success_count + fail_count` always equals the number of recipients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    /// Recipients that got every message.
    pub success_count: usize,
    /// Recipients with at least one failed or skipped message.
    pub fail_count: usize,
    /// Details for every failure, in input order.
    pub failed_recipients: Vec<FailedRecipient>,
}

impl DispatchResult {
    fn record_success(&mut self) {
        self.success_count += 1;
    }

    fn record_failure(&mut self, name: &str, reason: impl Into<String>) {
        self.fail_count += 1;
        self.failed_recipients.push(FailedRecipient {
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    /// Failures rendered as `"<name> (<reason>)"`.
    #[must_use]
    pub fn failed_users(&self) -> Vec<String> {
        self.failed_recipients.iter().map(ToString::to_string).collect()
    }

    /// Total recipients accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.success_count + self.fail_count
    }
}

struct Statements {
    directory: Arc<dyn RecipientDirectory>,
    renderer: Arc<dyn HistoryRenderer>,
}

/// Sends personalized messages to many recipients.
pub struct NotificationDispatcher {
    sessions: Arc<SessionLifecycle>,
    gate: Arc<dyn RateGate>,
    country_code: String,
    statements: Option<Statements>,
}

impl NotificationDispatcher {
    /// Dispatcher over the session lifecycle, pacing sends with `gate`.
    pub fn new(
        sessions: Arc<SessionLifecycle>,
        gate: Arc<dyn RateGate>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            gate,
            country_code: country_code.into(),
            statements: None,
        }
    }

    /// Enables statement attachments read from `directory`.
    #[must_use]
    pub fn with_statements(
        mut self,
        directory: Arc<dyn RecipientDirectory>,
        renderer: Arc<dyn HistoryRenderer>,
    ) -> Self {
        self.statements = Some(Statements {
            directory,
            renderer,
        });
        self
    }

    /// Sends `job` to every recipient.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::SessionUnavailable` if no session is connected;
    /// nothing is sent in that case.
    #[instrument(skip_all, fields(recipients = job.recipients.len()))]
    pub async fn dispatch(
        &self,
        job: &NotificationJob,
        context: &DispatchContext,
    ) -> Result<DispatchResult, DispatchError> {
        let session = self.sessions.active_session()?;
        audit::log_audit(&AuditEvent::DispatchStarted {
            recipients: job.recipients.len(),
        });

        let mut result = DispatchResult::default();
        let mut sent_any = false;

        for recipient in &job.recipients {
            let Some(phone) = recipient.contact() else {
                result.record_failure(&recipient.name, NO_PHONE);
                continue;
            };
            let Some(address) = normalize_phone(phone, &self.country_code) else {
                result.record_failure(&recipient.name, INVALID_PHONE);
                continue;
            };

            if sent_any {
                self.gate.wait().await;
            }
            sent_any = true;

            match self.send_one(session.as_ref(), recipient, &address, job, context).await {
                Ok(()) => result.record_success(),
                Err(reason) => {
                    warn!(recipient = %recipient.name, reason = %reason, "Notification failed");
                    result.record_failure(&recipient.name, reason);
                }
            }
        }

        debug_assert_eq!(result.total(), job.recipients.len());
        metrics::counter!("tally_dispatch_sent_total").increment(result.success_count as u64);
        metrics::counter!("tally_dispatch_failed_total").increment(result.fail_count as u64);
        info!(
            success = result.success_count,
            failed = result.fail_count,
            "Dispatch finished"
        );
        audit::log_audit(&AuditEvent::DispatchCompleted {
            succeeded: result.success_count,
            failed: result.fail_count,
        });
        Ok(result)
    }

    /// Runs `dispatch` on its own task so the caller is not blocked.
    pub fn spawn_dispatch(
        self: &Arc<Self>,
        job: NotificationJob,
        context: DispatchContext,
    ) -> JoinHandle<Result<DispatchResult, DispatchError>> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.dispatch(&job, &context).await })
    }

    async fn send_one(
        &self,
        session: &dyn MessagingSession,
        recipient: &Recipient,
        address: &str,
        job: &NotificationJob,
        context: &DispatchContext,
    ) -> Result<(), String> {
        let values = TemplateValues::for_recipient(recipient, context.period, context.duration.as_deref());
        let body = render(&job.template, &values);
        session
            .send_text(address, &body)
            .await
            .map_err(|e| e.to_string())?;

        if !context.include_statement {
            return Ok(());
        }
        let Some(statements) = &self.statements else {
            return Ok(());
        };

        // The primary message is already out; a statement failure only annotates it.
        let lines = statements
            .directory
            .transactions(recipient.id, context.period)
            .await
            .map_err(|e| format!("message sent, statement failed: {e}"))?;
        let document = statements.renderer.render(recipient, context.period, &lines);
        session
            .send_document(address, &document)
            .await
            .map_err(|e| format!("message sent, statement failed: {e}"))
    }
}
