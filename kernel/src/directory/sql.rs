//! `SQLite`-backed recipient directory.
//!
//! Read-only view over the application's `users` and `transactions` tables.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::instrument;

use crate::directory::types::{Period, Recipient, TransactionLine};
use crate::directory::{DirectoryError, RecipientDirectory};

/// Schema the directory expects. Applied by `bootstrap_schema` for local
/// development and tests; production databases are owned elsewhere.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT,
    balance INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    kind TEXT NOT NULL,
    amount INTEGER NOT NULL,
    note TEXT,
    created_at TEXT NOT NULL
);
";

/// Directory over a `SQLite` pool.
#[derive(Clone)]
pub struct SqlDirectory {
    pool: SqlitePool,
}

impl SqlDirectory {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url` with at most `max_connections` pooled connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DirectoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Creates the expected tables if they are missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    pub async fn bootstrap_schema(&self) -> Result<(), DirectoryError> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn recipient_from_row(row: &SqliteRow) -> Result<Recipient, sqlx::Error> {
    Ok(Recipient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        balance: row.try_get("balance")?,
    })
}

#[async_trait]
impl RecipientDirectory for SqlDirectory {
    #[instrument(skip(self))]
    async fn recipients(&self) -> Result<Vec<Recipient>, DirectoryError> {
        let rows = sqlx::query("SELECT id, name, phone, balance FROM users ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(recipient_from_row)
            .collect::<Result<_, _>>()
            .map_err(DirectoryError::from)
    }

    #[instrument(skip(self))]
    async fn find(&self, user_id: &str) -> Result<Option<Recipient>, DirectoryError> {
        let Ok(id) = user_id.trim().parse::<i64>() else {
            return Ok(None);
        };
        let row = sqlx::query("SELECT id, name, phone, balance FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(recipient_from_row)
            .transpose()
            .map_err(DirectoryError::from)
    }

    #[instrument(skip(self))]
    async fn transactions(
        &self,
        user_id: i64,
        period: Period,
    ) -> Result<Vec<TransactionLine>, DirectoryError> {
        let rows = sqlx::query(
            "SELECT created_at, kind, amount, note FROM transactions \
             WHERE user_id = ? AND strftime('%m', created_at) = ? AND strftime('%Y', created_at) = ? \
             ORDER BY created_at, id",
        )
        .bind(user_id)
        .bind(format!("{:02}", period.month()))
        .bind(period.year().to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            lines.push(TransactionLine {
                occurred_at: row.try_get("created_at")?,
                kind: row.try_get("kind")?,
                amount: row.try_get("amount")?,
                note: row.try_get("note")?,
            });
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> SqlDirectory {
        let directory = SqlDirectory::connect("sqlite::memory:", 1).await.unwrap();
        directory.bootstrap_schema().await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, name, phone, balance) VALUES \
             (1, 'Budi', '08123', 150000), (2, 'Ani', NULL, 0)",
        )
        .execute(directory.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO transactions (user_id, kind, amount, note, created_at) VALUES \
             (1, 'deposit', 50000, NULL, '2024-08-02 09:00:00'), \
             (1, 'withdrawal', 10000, 'books', '2024-08-20 10:30:00'), \
             (1, 'deposit', 25000, NULL, '2024-09-01 08:00:00')",
        )
        .execute(directory.pool())
        .await
        .unwrap();
        directory
    }

    #[tokio::test]
    async fn lists_recipients_by_name() {
        let directory = seeded().await;
        let recipients = directory.recipients().await.unwrap();
        let names: Vec<&str> = recipients.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Ani", "Budi"]);
        assert_eq!(recipients[0].phone, None);
        assert_eq!(recipients[1].balance, 150_000);
    }

    #[tokio::test]
    async fn find_by_textual_id() {
        let directory = seeded().await;
        assert_eq!(directory.find("1").await.unwrap().map(|r| r.name), Some("Budi".into()));
        assert!(directory.find("99").await.unwrap().is_none());
        assert!(directory.find("card-7").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transactions_are_filtered_by_month() {
        let directory = seeded().await;
        let lines = directory.transactions(1, Period::new(8, 2024)).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].note.as_deref(), Some("books"));
        assert!(directory
            .transactions(1, Period::new(7, 2024))
            .await
            .unwrap()
            .is_empty());
    }
}
