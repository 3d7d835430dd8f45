//! Storage capabilities consumed by the categorizer and importer
//!
//! The categorizer only needs [`PatternStore`]; statement import and
//! corrections need the wider [`RecordStore`]. [`Database`] implements both.

use std::collections::BTreeMap;

use crate::corrections::Correction;
use crate::db::Database;
use crate::error::Result;
use crate::models::{
    Category, Confidence, LearnedPattern, NewTransaction, Statement, StatementSummary,
    Transaction, User,
};

/// Confidence given to a pattern when a user teaches or re-teaches it
pub const SEED_CONFIDENCE: Confidence = Confidence::FULL;

/// Matches per pattern id gathered during an import
pub type PatternUses = BTreeMap<i64, i64>;

/// Per-user pattern persistence
pub trait PatternStore {
    /// All patterns belonging to the user
    fn patterns_for_user(&self, user_id: &str) -> Result<Vec<LearnedPattern>>;

    /// Create the pattern or, if the user already has it, set the new category,
    /// reset confidence to [`SEED_CONFIDENCE`] and bump the usage count
    fn upsert_pattern(
        &self,
        user_id: &str,
        pattern: &str,
        category: Category,
    ) -> Result<LearnedPattern>;

    /// Increment the usage count, returning the new value
    fn record_pattern_use(&self, user_id: &str, pattern_id: i64) -> Result<i64>;

    /// Remove a pattern; false when it did not exist for this user
    fn delete_pattern(&self, user_id: &str, pattern_id: i64) -> Result<bool>;
}

/// Users, statements and transactions
pub trait RecordStore: PatternStore {
    fn ensure_user(&self, user_id: &str, email: &str) -> Result<User>;

    /// Persist a statement, its transactions and the pattern usage counts atomically
    ///
    /// Uses of patterns that no longer exist are ignored.
    fn create_statement(
        &self,
        user_id: &str,
        filename: &str,
        summary: &StatementSummary,
        raw_data: &serde_json::Value,
        transactions: &[NewTransaction],
        pattern_uses: &PatternUses,
    ) -> Result<Statement>;

    fn get_statement(&self, user_id: &str, statement_id: i64) -> Result<Option<Statement>>;

    fn statement_transactions(&self, user_id: &str, statement_id: i64)
        -> Result<Vec<Transaction>>;

    fn get_transaction(&self, user_id: &str, transaction_id: i64) -> Result<Option<Transaction>>;

    /// Apply a user correction as one unit
    ///
    /// The transaction takes the category with confidence 1.0 and is marked
    /// `user_corrected`. The pattern (default: the description) is taught and
    /// the statement aggregates are re-derived before anything commits.
    fn apply_correction(
        &self,
        user_id: &str,
        transaction_id: i64,
        category: Category,
        pattern: Option<&str>,
    ) -> Result<Correction>;
}

impl PatternStore for Database {
    fn patterns_for_user(&self, user_id: &str) -> Result<Vec<LearnedPattern>> {
        self.list_patterns(user_id)
    }

    fn upsert_pattern(
        &self,
        user_id: &str,
        pattern: &str,
        category: Category,
    ) -> Result<LearnedPattern> {
        Database::upsert_pattern(self, user_id, pattern, category)
    }

    fn record_pattern_use(&self, user_id: &str, pattern_id: i64) -> Result<i64> {
        Database::record_pattern_use(self, user_id, pattern_id)
    }

    fn delete_pattern(&self, user_id: &str, pattern_id: i64) -> Result<bool> {
        Database::delete_pattern(self, user_id, pattern_id)
    }
}

impl RecordStore for Database {
    fn ensure_user(&self, user_id: &str, email: &str) -> Result<User> {
        Database::ensure_user(self, user_id, email)
    }

    fn create_statement(
        &self,
        user_id: &str,
        filename: &str,
        summary: &StatementSummary,
        raw_data: &serde_json::Value,
        transactions: &[NewTransaction],
        pattern_uses: &PatternUses,
    ) -> Result<Statement> {
        Database::create_statement(
            self,
            user_id,
            filename,
            summary,
            raw_data,
            transactions,
            pattern_uses,
        )
    }

    fn get_statement(&self, user_id: &str, statement_id: i64) -> Result<Option<Statement>> {
        Database::get_statement(self, user_id, statement_id)
    }

    fn statement_transactions(
        &self,
        user_id: &str,
        statement_id: i64,
    ) -> Result<Vec<Transaction>> {
        Database::statement_transactions(self, user_id, statement_id)
    }

    fn get_transaction(&self, user_id: &str, transaction_id: i64) -> Result<Option<Transaction>> {
        Database::get_transaction(self, user_id, transaction_id)
    }

    fn apply_correction(
        &self,
        user_id: &str,
        transaction_id: i64,
        category: Category,
        pattern: Option<&str>,
    ) -> Result<Correction> {
        Database::apply_correction(self, user_id, transaction_id, category, pattern)
    }
}
