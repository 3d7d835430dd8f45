//! User corrections of transaction categories
//!
//! A correction fixes the transaction and teaches the pattern store; the
//! owning statement's aggregates are re-derived in the same unit of work.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Category, LearnedPattern, StatementSummary, Transaction};
use crate::store::RecordStore;

/// Everything a correction changed
#[derive(Debug, Clone, Serialize)]
pub struct Correction {
    pub transaction: Transaction,
    pub pattern: LearnedPattern,
    pub summary: StatementSummary,
}

/// Re-categorize a transaction and learn from it
///
/// The pattern taught is `pattern_text` when given, otherwise the
/// transaction's full description. The store applies all of it atomically.
pub fn correct_transaction<S: RecordStore + ?Sized>(
    store: &S,
    user_id: &str,
    transaction_id: i64,
    category: Category,
    pattern_text: Option<&str>,
) -> Result<Correction> {
    let pattern_text = match pattern_text.map(str::trim) {
        Some("") => {
            return Err(Error::InvalidData(
                "Pattern text cannot be empty".to_string(),
            ))
        }
        other => other,
    };

    store.apply_correction(user_id, transaction_id, category, pattern_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::import::{ImportOptions, StatementImporter};
    use crate::models::Confidence;

    const USER: &str = "corrector";

    fn imported() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        db.ensure_user(USER, "c@example.com").unwrap();
        let csv = "Date,Description,Amount\n\
                   2026-04-01,CLIENT PAYMENT,2000.00\n\
                   2026-04-02,NORTHSIDE CAPITAL DAILY,-400.00\n";
        let options = ImportOptions {
            keyword_defaults: false,
            reference_year: 2026,
        };
        let outcome = StatementImporter::new(&db, options)
            .import_document(USER, "april.csv", csv.as_bytes(), None)
            .unwrap();
        (db, outcome.statement.id)
    }

    #[test]
    fn test_correction_updates_transaction_pattern_and_summary() {
        let (db, statement_id) = imported();
        let before = db.get_statement(USER, statement_id).unwrap().unwrap();
        let txn = db.statement_transactions(USER, statement_id).unwrap()[1].clone();
        assert_eq!(txn.category, Category::Uncategorized);

        let correction =
            correct_transaction(&db, USER, txn.id, Category::McaDebt, Some("northside capital"))
                .unwrap();

        assert!(correction.transaction.user_corrected);
        assert_eq!(correction.transaction.category_confidence, Confidence::FULL);
        assert_eq!(correction.pattern.pattern, "northside capital");
        assert_eq!(correction.pattern.category, Category::McaDebt);

        // Debt ratio 0.2 now costs 12 points it did not before
        assert_eq!(
            correction.summary.health_score,
            before.summary.health_score - 12.0
        );
        let after = db.get_statement(USER, statement_id).unwrap().unwrap();
        assert_eq!(after.summary, correction.summary);
    }

    #[test]
    fn test_correction_defaults_to_description() {
        let (db, statement_id) = imported();
        let txn = db.statement_transactions(USER, statement_id).unwrap()[0].clone();

        let correction = correct_transaction(&db, USER, txn.id, Category::Revenue, None).unwrap();
        assert_eq!(correction.pattern.pattern, "CLIENT PAYMENT");
    }

    #[test]
    fn test_blank_pattern_text_changes_nothing() {
        let (db, statement_id) = imported();
        let txn = db.statement_transactions(USER, statement_id).unwrap()[1].clone();

        let result = correct_transaction(&db, USER, txn.id, Category::McaDebt, Some("  "));
        assert!(matches!(result, Err(Error::InvalidData(_))));

        let unchanged = db.get_transaction(USER, txn.id).unwrap().unwrap();
        assert!(!unchanged.user_corrected);
        assert!(db.list_patterns(USER).unwrap().is_empty());
    }

    #[test]
    fn test_correcting_foreign_transaction_is_not_found() {
        let (db, statement_id) = imported();
        db.ensure_user("intruder", "i@example.com").unwrap();
        let txn = db.statement_transactions(USER, statement_id).unwrap()[0].clone();

        let result = correct_transaction(&db, "intruder", txn.id, Category::Rent, None);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(db.list_patterns("intruder").unwrap().is_empty());
    }
}
