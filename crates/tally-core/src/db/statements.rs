//! Statement operations

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::patterns::record_pattern_uses_in;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Statement, StatementSummary};
use crate::store::PatternUses;

const STATEMENT_COLUMNS: &str = r#"
    id, user_id, filename, upload_date, statement_month, total_transactions,
    total_revenue, total_expenses, net_cash_flow, health_score, raw_data
"#;

/// Overwrite the derived aggregates of a statement
pub(crate) fn update_summary_in(
    conn: &Connection,
    user_id: &str,
    statement_id: i64,
    summary: &StatementSummary,
) -> Result<()> {
    let updated = conn.execute(
        r#"
        UPDATE bank_statements SET
            statement_month = ?, total_transactions = ?, total_revenue = ?,
            total_expenses = ?, net_cash_flow = ?, health_score = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND user_id = ?
        "#,
        params![
            summary.statement_month,
            summary.total_transactions,
            summary.total_revenue,
            summary.total_expenses,
            summary.net_cash_flow,
            summary.health_score,
            statement_id,
            user_id,
        ],
    )?;

    if updated == 0 {
        return Err(Error::NotFound(format!("Statement {}", statement_id)));
    }
    Ok(())
}

impl Database {
    /// Insert a statement together with its transactions and pattern usage
    ///
    /// Runs in one SQL transaction: either everything lands or nothing does.
    pub fn create_statement(
        &self,
        user_id: &str,
        filename: &str,
        summary: &StatementSummary,
        raw_data: &serde_json::Value,
        transactions: &[NewTransaction],
        pattern_uses: &PatternUses,
    ) -> Result<Statement> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let raw_json = serde_json::to_string(raw_data)?;
        tx.execute(
            r#"
            INSERT INTO bank_statements
                (user_id, filename, statement_month, total_transactions, total_revenue,
                 total_expenses, net_cash_flow, health_score, raw_data)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                filename,
                summary.statement_month,
                summary.total_transactions,
                summary.total_revenue,
                summary.total_expenses,
                summary.net_cash_flow,
                summary.health_score,
                raw_json,
            ],
        )?;
        let statement_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO transactions
                    (statement_id, date, description, amount, category, category_confidence)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for t in transactions {
                stmt.execute(params![
                    statement_id,
                    t.date.to_string(),
                    t.description,
                    t.amount,
                    t.category.as_str(),
                    t.category_confidence.value(),
                ])?;
            }
        }

        record_pattern_uses_in(&tx, user_id, pattern_uses)?;

        let statement = tx.query_row(
            &format!(
                "SELECT {} FROM bank_statements WHERE id = ?",
                STATEMENT_COLUMNS
            ),
            params![statement_id],
            |row| Self::row_to_statement(row, true),
        )?;

        tx.commit()?;

        info!(
            "Stored statement {} ({}) with {} transactions",
            statement_id,
            filename,
            transactions.len()
        );
        Ok(statement)
    }

    /// List a user's statements, newest upload first (raw payload omitted)
    pub fn list_statements(&self, user_id: &str) -> Result<Vec<Statement>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bank_statements WHERE user_id = ? ORDER BY upload_date DESC, id DESC",
            STATEMENT_COLUMNS
        ))?;

        let statements = stmt
            .query_map(params![user_id], |row| Self::row_to_statement(row, false))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(statements)
    }

    /// Get one of the user's statements, including the raw payload
    pub fn get_statement(&self, user_id: &str, statement_id: i64) -> Result<Option<Statement>> {
        let conn = self.conn()?;

        let statement = conn
            .query_row(
                &format!(
                    "SELECT {} FROM bank_statements WHERE id = ? AND user_id = ?",
                    STATEMENT_COLUMNS
                ),
                params![statement_id, user_id],
                |row| Self::row_to_statement(row, true),
            )
            .optional()?;

        Ok(statement)
    }

    /// Delete a statement and (by cascade) its transactions
    pub fn delete_statement(&self, user_id: &str, statement_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM bank_statements WHERE id = ? AND user_id = ?",
            params![statement_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn row_to_statement(row: &rusqlite::Row, with_raw: bool) -> rusqlite::Result<Statement> {
        let upload_date: String = row.get(3)?;
        let raw_data = if with_raw {
            let raw: Option<String> = row.get(10)?;
            raw.and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or(serde_json::Value::Null)
        } else {
            serde_json::Value::Null
        };

        Ok(Statement {
            id: row.get(0)?,
            user_id: row.get(1)?,
            filename: row.get(2)?,
            upload_date: parse_datetime(&upload_date),
            summary: StatementSummary {
                statement_month: row.get(4)?,
                total_transactions: row.get(5)?,
                total_revenue: row.get(6)?,
                total_expenses: row.get(7)?,
                net_cash_flow: row.get(8)?,
                health_score: row.get(9)?,
            },
            raw_data,
        })
    }
}
