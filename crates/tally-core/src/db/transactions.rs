//! Transaction reads and corrections
//!
//! Transactions are only reachable through a statement owned by the caller.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::patterns::upsert_pattern_in;
use super::statements::update_summary_in;
use super::{category_column, confidence_column, parse_datetime, Database};
use crate::corrections::Correction;
use crate::error::{Error, Result};
use crate::health::{summarize, SummaryRow};
use crate::models::{Category, Transaction};

const TRANSACTION_SELECT: &str = r#"
    SELECT t.id, t.statement_id, t.date, t.description, t.amount, t.category,
           t.category_confidence, t.user_corrected, t.created_at
    FROM transactions t
    JOIN bank_statements s ON s.id = t.statement_id
"#;

fn transactions_in(conn: &Connection, user_id: &str, statement_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE t.statement_id = ? AND s.user_id = ? ORDER BY t.date, t.id",
        TRANSACTION_SELECT
    ))?;

    let transactions = stmt
        .query_map(params![statement_id, user_id], Database::row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(transactions)
}

fn transaction_in(
    conn: &Connection,
    user_id: &str,
    transaction_id: i64,
) -> Result<Option<Transaction>> {
    let transaction = conn
        .query_row(
            &format!("{} WHERE t.id = ? AND s.user_id = ?", TRANSACTION_SELECT),
            params![transaction_id, user_id],
            Database::row_to_transaction,
        )
        .optional()?;

    Ok(transaction)
}

impl Database {
    /// Transactions of one of the user's statements, in date order
    pub fn statement_transactions(
        &self,
        user_id: &str,
        statement_id: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        transactions_in(&conn, user_id, statement_id)
    }

    /// Get a single transaction if it belongs to the user
    pub fn get_transaction(&self, user_id: &str, transaction_id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        transaction_in(&conn, user_id, transaction_id)
    }

    /// Re-categorize a transaction, teach the pattern and refresh the statement
    ///
    /// One SQL transaction: a failure at any step leaves everything as it was.
    /// The pattern text defaults to the transaction's description.
    pub fn apply_correction(
        &self,
        user_id: &str,
        transaction_id: i64,
        category: Category,
        pattern: Option<&str>,
    ) -> Result<Correction> {
        let not_found = || Error::NotFound(format!("Transaction {}", transaction_id));

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing = transaction_in(&tx, user_id, transaction_id)?.ok_or_else(not_found)?;

        tx.execute(
            r#"
            UPDATE transactions SET
                category = ?,
                category_confidence = 1.0,
                user_corrected = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![category.as_str(), transaction_id],
        )?;

        let pattern = upsert_pattern_in(
            &tx,
            user_id,
            pattern.unwrap_or(existing.description.as_str()),
            category,
        )?;

        let transactions = transactions_in(&tx, user_id, existing.statement_id)?;
        let summary = {
            let rows: Vec<SummaryRow> = transactions.iter().map(SummaryRow::from).collect();
            summarize(&rows)
        };
        update_summary_in(&tx, user_id, existing.statement_id, &summary)?;

        let transaction = transactions
            .into_iter()
            .find(|t| t.id == transaction_id)
            .ok_or_else(not_found)?;

        tx.commit()?;

        info!(
            "Corrected transaction {} to {} (pattern '{}')",
            transaction_id, category, pattern.pattern
        );
        Ok(Correction {
            transaction,
            pattern,
            summary,
        })
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let created_at: String = row.get(8)?;

        Ok(Transaction {
            id: row.get(0)?,
            statement_id: row.get(1)?,
            date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            description: row.get(3)?,
            amount: row.get(4)?,
            category: category_column(row, 5)?,
            category_confidence: confidence_column(row, 6)?,
            user_corrected: row.get(7)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
