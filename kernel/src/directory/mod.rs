//! Recipient directory: the read side of the application's user records.

pub mod sql;
pub mod types;

use async_trait::async_trait;

pub use sql::SqlDirectory;
pub use types::{Period, Recipient, TransactionLine};

/// Errors raised by a directory backend.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Database-related error.
    #[error("Database Error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Lookup of recipients and their history.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Every user that may receive a notification, in a stable order.
    async fn recipients(&self) -> Result<Vec<Recipient>, DirectoryError>;

    /// Looks up one user by the id an attendance device reported.
    async fn find(&self, user_id: &str) -> Result<Option<Recipient>, DirectoryError>;

    /// Transactions of `user_id` within `period`, oldest first.
    async fn transactions(
        &self,
        user_id: i64,
        period: Period,
    ) -> Result<Vec<TransactionLine>, DirectoryError>;
}
