use serde::Serialize;
use tracing::{info, info_span};

/// Domain event for audit logging.
/// Structured for JSON serialization to enable machine-readable audit trails.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The process finished startup.
    SystemStartup {
        /// Component that started.
        component: String,
    },
    /// The process is shutting down.
    SystemShutdown {
        /// Shutdown trigger.
        reason: String,
    },
    /// The messaging account lost its credentials.
    SessionLoggedOut {
        /// What ended the session.
        reason: String,
    },
    /// A notification batch was accepted.
    DispatchStarted {
        /// Recipients in the batch.
        recipients: usize,
    },
    /// A notification batch finished.
    DispatchCompleted {
        /// Recipients that got every message.
        succeeded: usize,
        /// Recipients with at least one failure.
        failed: usize,
    },
}

/// Logs an audit event to the dedicated audit channel as structured JSON.
/// This uses a specific `target` which can be filtered by the subscriber to redirect to a secure file.
pub fn log_audit(event: &AuditEvent) {
    let span = info_span!(target: "audit", "audit_event");
    let _enter = span.enter();

    let json = serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
    info!(target: "audit", audit_json = %json, "Audit Event");
}
