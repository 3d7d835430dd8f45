//! Statement import command

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{db::Database, DocumentFormat, ImportOptions, StatementImporter};

use super::ensure_local_user;

pub fn cmd_import(
    db: &Database,
    user_id: &str,
    file: &Path,
    format_str: Option<&str>,
    options: ImportOptions,
) -> Result<()> {
    let format: Option<DocumentFormat> = format_str
        .map(|f| {
            f.parse()
                .map_err(|e: String| anyhow::anyhow!("{} (valid formats: csv, text, pdf)", e))
        })
        .transpose()?;

    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    println!("📥 Importing {}...", file.display());

    ensure_local_user(db, user_id)?;
    let outcome = StatementImporter::new(db, options)
        .import_document(user_id, &filename, &bytes, format)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    let summary = &outcome.statement.summary;
    println!("✅ Import complete! (statement #{})", outcome.statement.id);
    println!("   Imported: {}", outcome.imported);
    println!("   - By learned pattern: {}", outcome.breakdown.learned);
    if outcome.breakdown.keyword > 0 {
        println!("   - By keyword: {}", outcome.breakdown.keyword);
    }
    println!("   - Uncategorized: {}", outcome.breakdown.uncategorized);

    if !outcome.skipped.is_empty() {
        println!("   ⚠️  Skipped: {}", outcome.skipped.len());
        for row in &outcome.skipped {
            println!("      line {}: {}", row.line, row.reason);
        }
    }

    println!();
    println!("📊 Statement Summary");
    println!("   ─────────────────────────────");
    if let Some(month) = &summary.statement_month {
        println!("   Month:         {}", month);
    }
    println!("   Revenue:       ${:.2}", summary.total_revenue);
    println!("   Expenses:      ${:.2}", summary.total_expenses);
    println!("   Net cash flow: ${:.2}", summary.net_cash_flow);
    println!("   Health score:  {:.0}/100", summary.health_score);

    Ok(())
}
