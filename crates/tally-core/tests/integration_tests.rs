//! Integration tests for tally-core
//!
//! These tests exercise the full teach → import → correct workflow.

use tally_core::{
    correct_transaction,
    db::Database,
    import::{csv_rows, text_rows},
    Categorizer, Category, Confidence, ImportOptions, PatternStore, StatementImporter,
};

const USER: &str = "user-integration";

fn setup() -> Database {
    let db = Database::in_memory().expect("Failed to create database");
    db.ensure_user(USER, "integration@example.com")
        .expect("Failed to record user");
    db
}

fn options() -> ImportOptions {
    ImportOptions {
        keyword_defaults: false,
        reference_year: 2026,
    }
}

/// Ten rows, the seventh with an amount that cannot be parsed
fn statement_with_one_bad_amount() -> &'static str {
    r#"Date,Description,Amount
03/01/2026,DAILY ACH DEBIT 123,-250.00
03/02/2026,CUSTOMER PAYMENT,1800.00
03/03/2026,DAILY ACH DEBIT 124,-250.00
03/04/2026,OFFICE RENT,-1200.00
03/05/2026,DAILY ACH DEBIT 125,-250.00
03/06/2026,CUSTOMER PAYMENT,2200.00
03/07/2026,GUSTO PAYROLL,twelve hundred
03/08/2026,DAILY ACH DEBIT 126,-250.00
03/09/2026,ELECTRIC CO,-140.25
03/10/2026,"CUSTOMER PAYMENT, INV 88","$1,050.00""#
}

// =============================================================================
// Categorization Workflow Tests
// =============================================================================

#[test]
fn test_daily_ach_scenario() {
    let db = setup();

    db.upsert_pattern(USER, "DAILY ACH", Category::McaDebt)
        .expect("Failed to teach pattern");

    let mut categorizer = Categorizer::load(&db, USER).expect("Failed to load patterns");
    let result = categorizer
        .categorize(Some("DAILY ACH DEBIT 123"))
        .expect("Categorization failed");

    assert_eq!(result.category, Category::McaDebt);
    assert!(result.confidence.value() > 0.0);

    let patterns = db.patterns_for_user(USER).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].times_used, 2, "one teach plus one match");
}

#[test]
fn test_usage_count_grows_by_match_count() {
    let db = setup();
    let pattern = db.upsert_pattern(USER, "fundbox", Category::McaDebt).unwrap();

    let mut categorizer = Categorizer::load(&db, USER).unwrap();
    for n in 0..4 {
        categorizer
            .categorize(Some(format!("FUNDBOX PAYMENT {}", n).as_str()))
            .unwrap();
    }
    categorizer.categorize(Some("no match here")).unwrap();

    let reloaded = db.get_pattern(USER, pattern.id).unwrap().unwrap();
    assert_eq!(reloaded.times_used, pattern.times_used + 4);
}

#[test]
fn test_reteaching_updates_instead_of_duplicating() {
    let db = setup();
    db.upsert_pattern(USER, "Stripe", Category::Revenue).unwrap();
    db.upsert_pattern(USER, "stripe", Category::TransferIn).unwrap();

    let patterns = db.patterns_for_user(USER).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].category, Category::TransferIn);
    assert_eq!(patterns[0].confidence, Confidence::FULL);
    assert_eq!(patterns[0].times_used, 2);
}

// =============================================================================
// Import Workflow Tests
// =============================================================================

#[test]
fn test_import_skips_bad_row_and_keeps_the_rest() {
    let db = setup();
    db.upsert_pattern(USER, "DAILY ACH", Category::McaDebt).unwrap();

    let rows = csv_rows(statement_with_one_bad_amount().as_bytes()).expect("CSV layout");
    let outcome = StatementImporter::new(&db, options())
        .import(USER, "march.csv", rows)
        .expect("Import failed");

    assert_eq!(outcome.imported, 9);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].line, 8);
    assert!(outcome.skipped[0].reason.contains("twelve hundred"));

    let transactions = db
        .statement_transactions(USER, outcome.statement.id)
        .unwrap();
    assert_eq!(transactions.len(), 9);
    assert_eq!(outcome.statement.summary.total_transactions, 9);

    let mca = transactions
        .iter()
        .filter(|t| t.category == Category::McaDebt)
        .count();
    assert_eq!(mca, 4);

    // Four DAILY ACH rows were categorized on top of the teach
    let pattern = &db.patterns_for_user(USER).unwrap()[0];
    assert_eq!(pattern.times_used, 5);

    let last = transactions.last().unwrap();
    assert_eq!(last.description, "CUSTOMER PAYMENT, INV 88");
    assert_eq!(last.amount, 1050.0);
}

#[test]
fn test_correction_feeds_future_imports() {
    let db = setup();
    let importer = StatementImporter::new(&db, options());

    let text = "03/01 NORTHSIDE CAPITAL DAILY -$300.00\n03/02 CARD SALES $2,000.00\n";
    let first = importer
        .import(USER, "march.txt", text_rows(text).unwrap())
        .unwrap();
    let txns = db.statement_transactions(USER, first.statement.id).unwrap();
    assert_eq!(txns[0].category, Category::Uncategorized);

    correct_transaction(&db, USER, txns[0].id, Category::McaDebt, Some("northside capital"))
        .expect("Correction failed");

    let text = "04/01 NORTHSIDE CAPITAL DAILY -$300.00\n";
    let second = importer
        .import(USER, "april.txt", text_rows(text).unwrap())
        .unwrap();
    let txns = db.statement_transactions(USER, second.statement.id).unwrap();
    assert_eq!(txns[0].category, Category::McaDebt);
    assert!(!txns[0].user_corrected);
}

#[test]
fn test_users_never_see_each_others_patterns() {
    let db = setup();
    db.ensure_user("user-other", "other@example.com").unwrap();
    db.upsert_pattern("user-other", "rent", Category::Rent).unwrap();

    let categorizer = Categorizer::load(&db, USER).unwrap();
    assert!(categorizer.preview(Some("OFFICE RENT")).is_uncategorized());
}
