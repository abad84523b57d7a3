//! Bulk notification dispatch.

pub mod address;
pub mod dispatcher;
pub mod rate;
pub mod statement;
pub mod template;

pub use dispatcher::{
    DispatchContext, DispatchError, DispatchResult, FailedRecipient, NotificationDispatcher,
    NotificationJob,
};
pub use rate::{FixedIntervalGate, RateGate, Unthrottled};
pub use statement::{HistoryRenderer, TextStatementRenderer};
pub use template::{format_balance, render, TemplateValues};
