//! Message templates with named placeholders.
//!
//! Supported placeholders: `{name}`, `{balance}`, `{month}`, `{year}` and
//! `{duration}`. Anything else between braces is left untouched.

use crate::directory::{Period, Recipient};

/// Values substituted into one recipient's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateValues {
    /// Recipient display name.
    pub name: String,
    /// Formatted balance, e.g. `Rp 150.000`.
    pub balance: String,
    /// Month name.
    pub month: String,
    /// Four digit year.
    pub year: String,
    /// Human readable coverage, e.g. `August 2024`.
    pub duration: String,
}

impl TemplateValues {
    /// Values for `recipient` in `period`; `duration` defaults to `"<month> <year>"`.
    #[must_use]
    pub fn for_recipient(recipient: &Recipient, period: Period, duration: Option<&str>) -> Self {
        let month = period.month_name().to_string();
        let year = period.year().to_string();
        let duration = duration.map_or_else(|| format!("{month} {year}"), str::to_string);
        Self {
            name: recipient.name.clone(),
            balance: format_balance(recipient.balance),
            month,
            year,
            duration,
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(&self.name),
            "balance" => Some(&self.balance),
            "month" => Some(&self.month),
            "year" => Some(&self.year),
            "duration" => Some(&self.duration),
            _ => None,
        }
    }
}

/// Substitutes every known placeholder in `template`.
#[must_use]
pub fn render(template: &str, values: &TemplateValues) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match values.lookup(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Formats whole currency units with `.` thousands separators: `Rp 1.250.000`.
#[must_use]
pub fn format_balance(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("Rp -{grouped}")
    } else {
        format!("Rp {grouped}")
    }
}
