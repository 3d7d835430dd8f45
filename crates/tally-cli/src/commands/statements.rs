//! Statement command implementations

use anyhow::Result;
use tally_core::db::Database;

use super::truncate;

pub fn cmd_statements_list(db: &Database, user_id: &str) -> Result<()> {
    let statements = db.list_statements(user_id)?;

    if statements.is_empty() {
        println!("No statements imported. Import one with:");
        println!("  tally import --file statement.csv");
        return Ok(());
    }

    println!();
    println!("📄 Statements");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:24} │ {:7} │ {:>5} │ {:>12} │ {:>6}",
        "ID", "File", "Month", "Txns", "Net", "Health"
    );
    println!("   ─────┼──────────────────────────┼─────────┼───────┼──────────────┼───────");

    for statement in statements {
        let summary = &statement.summary;
        println!(
            "   {:>4} │ {:24} │ {:7} │ {:>5} │ {:>12.2} │ {:>6.0}",
            statement.id,
            truncate(&statement.filename, 24),
            summary.statement_month.as_deref().unwrap_or("-"),
            summary.total_transactions,
            summary.net_cash_flow,
            summary.health_score
        );
    }

    Ok(())
}

pub fn cmd_statements_show(db: &Database, user_id: &str, id: i64) -> Result<()> {
    let statement = db
        .get_statement(user_id, id)?
        .ok_or_else(|| anyhow::anyhow!("Statement not found: {}", id))?;
    let transactions = db.statement_transactions(user_id, id)?;
    let summary = &statement.summary;

    println!();
    println!("📄 {} (#{})", statement.filename, statement.id);
    println!("   Uploaded:      {}", statement.upload_date.format("%Y-%m-%d %H:%M"));
    if let Some(month) = &summary.statement_month {
        println!("   Month:         {}", month);
    }
    println!("   Revenue:       ${:.2}", summary.total_revenue);
    println!("   Expenses:      ${:.2}", summary.total_expenses);
    println!("   Net cash flow: ${:.2}", summary.net_cash_flow);
    println!("   Health score:  {:.0}/100", summary.health_score);
    println!();
    println!(
        "   {:>5} │ {:10} │ {:30} │ {:>10} │ {}",
        "ID", "Date", "Description", "Amount", "Category"
    );
    println!("   ──────┼────────────┼────────────────────────────────┼────────────┼─────────────");

    for tx in transactions {
        let corrected = if tx.user_corrected { " ✎" } else { "" };
        println!(
            "   {:>5} │ {:10} │ {:30} │ {:>10.2} │ {} ({}){}",
            tx.id,
            tx.date,
            truncate(&tx.description, 30),
            tx.amount,
            tx.category,
            tx.category_confidence,
            corrected
        );
    }

    Ok(())
}

pub fn cmd_statements_delete(db: &Database, user_id: &str, id: i64) -> Result<()> {
    if !db.delete_statement(user_id, id)? {
        anyhow::bail!("Statement not found: {}", id);
    }
    println!("✅ Deleted statement #{} and its transactions", id);

    Ok(())
}
