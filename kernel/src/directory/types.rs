//! Records read from the surrounding application's database.

use chrono::{Datelike, Utc};
use serde::Serialize;

/// A person who can receive notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    /// Primary key in the users table.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Raw phone number as entered by staff; may be missing or blank.
    pub phone: Option<String>,
    /// Savings balance in whole currency units.
    pub balance: i64,
}

impl Recipient {
    /// Phone number with surrounding whitespace removed, if any is left.
    #[must_use]
    pub fn contact(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// One line of a recipient's transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionLine {
    /// Timestamp text as stored, `YYYY-MM-DD HH:MM:SS`.
    pub occurred_at: String,
    /// `deposit`, `withdrawal`, ...
    pub kind: String,
    /// Amount in whole currency units.
    pub amount: i64,
    /// Free-form note.
    pub note: Option<String>,
}

/// Calendar month used for templates and history queries.
///
/// Only built through [`Period::new`], so the month is always in `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    month: u32,
    year: i32,
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

impl Period {
    /// Builds a period, clamping the month into `1..=12`.
    #[must_use]
    pub fn new(month: u32, year: i32) -> Self {
        Self {
            month: month.clamp(1, 12),
            year,
        }
    }

    /// The current UTC month.
    #[must_use]
    pub fn current() -> Self {
        let now = Utc::now();
        Self::new(now.month(), now.year())
    }

    /// 1-based month.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Four digit year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// English month name.
    #[must_use]
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_phone_is_no_contact() {
        let mut recipient = Recipient {
            id: 1,
            name: "Ani".into(),
            phone: Some("  ".into()),
            balance: 0,
        };
        assert_eq!(recipient.contact(), None);
        recipient.phone = Some(" 0812 ".into());
        assert_eq!(recipient.contact(), Some("0812"));
    }

    #[test]
    fn period_clamps_and_names_months() {
        assert_eq!(Period::new(0, 2024).month_name(), "January");
        assert_eq!(Period::new(13, 2024).month_name(), "December");
        assert_eq!(Period::new(8, 2024).month_name(), "August");
    }

    #[test]
    fn out_of_range_months_never_escape_the_constructor() {
        for month in [0, 13, u32::MAX] {
            let period = Period::new(month, 2024);
            assert!((1..=12).contains(&period.month()));
            assert!(!period.month_name().is_empty());
        }
        assert_eq!(Period::new(8, 2024).year(), 2024);
    }
}
