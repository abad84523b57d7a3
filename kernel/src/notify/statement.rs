//! Plain-text account statements sent as attachments.

use std::fmt::Write;

use crate::directory::{Period, Recipient, TransactionLine};
use crate::notify::template::format_balance;
use crate::session::Document;

/// Renders a recipient's history into a sendable document.
pub trait HistoryRenderer: Send + Sync {
    /// Builds the document for `recipient` and `lines` in `period`.
    fn render(&self, recipient: &Recipient, period: Period, lines: &[TransactionLine]) -> Document;
}

/// Fixed-width text statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextStatementRenderer;

impl HistoryRenderer for TextStatementRenderer {
    fn render(&self, recipient: &Recipient, period: Period, lines: &[TransactionLine]) -> Document {
        let mut body = String::new();
        let _ = writeln!(body, "Savings statement - {} {}", period.month_name(), period.year());
        let _ = writeln!(body, "Name    : {}", recipient.name);
        let _ = writeln!(body, "Balance : {}", format_balance(recipient.balance));
        body.push('\n');

        if lines.is_empty() {
            body.push_str("No transactions this month.\n");
        } else {
            let _ = writeln!(body, "{:<20} {:<12} {:>15}  Note", "Date", "Type", "Amount");
            for line in lines {
                let _ = writeln!(
                    body,
                    "{:<20} {:<12} {:>15}  {}",
                    line.occurred_at,
                    line.kind,
                    format_balance(line.amount),
                    line.note.as_deref().unwrap_or("-")
                );
            }
        }

        Document {
            file_name: format!(
                "statement-{}-{:02}-{}.txt",
                period.year(), period.month(), recipient.id
            ),
            mime_type: "text/plain".to_string(),
            content: body.into_bytes(),
            caption: Some(format!(
                "Transaction history {} {}",
                period.month_name(),
                period.year()
            )),
        }
    }
}
