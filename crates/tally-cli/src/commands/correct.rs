//! Category correction command

use anyhow::{Context, Result};
use tally_core::{correct_transaction, db::Database, Category};

pub fn cmd_correct(
    db: &Database,
    user_id: &str,
    transaction_id: i64,
    category_str: &str,
    pattern: Option<&str>,
) -> Result<()> {
    let category: Category = category_str
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let correction = correct_transaction(db, user_id, transaction_id, category, pattern)
        .with_context(|| format!("Failed to correct transaction {}", transaction_id))?;

    println!(
        "✅ Transaction #{} is now {}",
        correction.transaction.id, correction.transaction.category
    );
    println!(
        "   Learned '{}' -> {} (used {} times)",
        correction.pattern.pattern, correction.pattern.category, correction.pattern.times_used
    );
    println!(
        "   Statement #{} health score: {:.0}/100",
        correction.transaction.statement_id, correction.summary.health_score
    );

    Ok(())
}
