//! Learned pattern operations

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{category_column, confidence_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, LearnedPattern};
use crate::store::{PatternUses, SEED_CONFIDENCE};

const PATTERN_COLUMNS: &str =
    "id, user_id, pattern, category, times_used, confidence, created_at, updated_at";

/// Trim pattern text, rejecting empty input
pub(crate) fn normalize_pattern(pattern: &str) -> Result<&str> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidData("Pattern text cannot be empty".to_string()));
    }
    Ok(trimmed)
}

/// Uniqueness key: trimmed, Unicode-lowercased text (SQLite NOCASE only folds ASCII)
pub(crate) fn pattern_key(pattern: &str) -> String {
    pattern.trim().to_lowercase()
}

/// Teach a pattern on an open connection or transaction
pub(crate) fn upsert_pattern_in(
    conn: &Connection,
    user_id: &str,
    pattern: &str,
    category: Category,
) -> Result<LearnedPattern> {
    let pattern = normalize_pattern(pattern)?;

    let learned = conn.query_row(
        &format!(
            r#"
            INSERT INTO learned_patterns
                (user_id, pattern, pattern_key, category, times_used, confidence)
            VALUES (?1, ?2, ?3, ?4, 1, ?5)
            ON CONFLICT(user_id, pattern_key) DO UPDATE SET
                category = excluded.category,
                confidence = excluded.confidence,
                times_used = learned_patterns.times_used + 1,
                updated_at = CURRENT_TIMESTAMP
            RETURNING {}
            "#,
            PATTERN_COLUMNS
        ),
        params![
            user_id,
            pattern,
            pattern_key(pattern),
            category.as_str(),
            SEED_CONFIDENCE.value()
        ],
        Database::row_to_pattern,
    )?;

    info!(
        "Learned pattern '{}' -> {} (used {} times)",
        learned.pattern, learned.category, learned.times_used
    );
    Ok(learned)
}

/// Add tallied import matches to the usage counts; vanished patterns are skipped
pub(crate) fn record_pattern_uses_in(
    conn: &Connection,
    user_id: &str,
    uses: &PatternUses,
) -> Result<()> {
    let mut stmt = conn.prepare(
        r#"
        UPDATE learned_patterns SET
            times_used = times_used + ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND user_id = ?
        "#,
    )?;

    for (pattern_id, count) in uses {
        if stmt.execute(params![count, pattern_id, user_id])? == 0 {
            debug!("Pattern {} disappeared during import, use not counted", pattern_id);
        }
    }
    Ok(())
}

impl Database {
    /// All of a user's patterns, most recently touched first
    pub fn list_patterns(&self, user_id: &str) -> Result<Vec<LearnedPattern>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM learned_patterns WHERE user_id = ? ORDER BY updated_at DESC, id DESC",
            PATTERN_COLUMNS
        ))?;

        let patterns = stmt
            .query_map(params![user_id], Self::row_to_pattern)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(patterns)
    }

    /// Get a single pattern owned by the user
    pub fn get_pattern(&self, user_id: &str, pattern_id: i64) -> Result<Option<LearnedPattern>> {
        let conn = self.conn()?;

        let pattern = conn
            .query_row(
                &format!(
                    "SELECT {} FROM learned_patterns WHERE id = ? AND user_id = ?",
                    PATTERN_COLUMNS
                ),
                params![pattern_id, user_id],
                Self::row_to_pattern,
            )
            .optional()?;

        Ok(pattern)
    }

    /// Teach (or re-teach) a pattern
    ///
    /// A single `INSERT ... ON CONFLICT DO UPDATE`: concurrent teaches of the
    /// same text never lose an increment. Texts differing only in case are the
    /// same pattern; the stored text keeps the casing it was first taught with.
    pub fn upsert_pattern(
        &self,
        user_id: &str,
        pattern: &str,
        category: Category,
    ) -> Result<LearnedPattern> {
        let conn = self.conn()?;
        upsert_pattern_in(&conn, user_id, pattern, category)
    }

    /// Count one more application of a pattern
    pub fn record_pattern_use(&self, user_id: &str, pattern_id: i64) -> Result<i64> {
        let conn = self.conn()?;

        let times_used: Option<i64> = conn
            .query_row(
                r#"
                UPDATE learned_patterns SET
                    times_used = times_used + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ? AND user_id = ?
                RETURNING times_used
                "#,
                params![pattern_id, user_id],
                |row| row.get(0),
            )
            .optional()?;

        let times_used =
            times_used.ok_or_else(|| Error::NotFound(format!("Pattern {}", pattern_id)))?;
        debug!("Pattern {} now used {} times", pattern_id, times_used);
        Ok(times_used)
    }

    /// Remove a pattern. Returns false when the user has no such pattern.
    pub fn delete_pattern(&self, user_id: &str, pattern_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM learned_patterns WHERE id = ? AND user_id = ?",
            params![pattern_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    pub(crate) fn row_to_pattern(row: &rusqlite::Row) -> rusqlite::Result<LearnedPattern> {
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;

        Ok(LearnedPattern {
            id: row.get(0)?,
            user_id: row.get(1)?,
            pattern: row.get(2)?,
            category: category_column(row, 3)?,
            times_used: row.get(4)?,
            confidence: confidence_column(row, 5)?,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }
}
