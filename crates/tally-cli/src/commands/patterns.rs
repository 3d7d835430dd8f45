//! Learned pattern command implementations

use anyhow::Result;
use tally_core::{db::Database, keyword_category, Categorizer, Category};

use super::{ensure_local_user, truncate};

pub fn cmd_patterns_list(db: &Database, user_id: &str) -> Result<()> {
    let patterns = db.list_patterns(user_id)?;

    if patterns.is_empty() {
        println!("No patterns learned yet. Teach one with:");
        println!("  tally patterns add <pattern> <category>");
        return Ok(());
    }

    println!();
    println!("🧠 Learned Patterns");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:30} │ {:14} │ {:>5} │ {}",
        "ID", "Pattern", "Category", "Used", "Confidence"
    );
    println!("   ─────┼────────────────────────────────┼────────────────┼───────┼───────────");

    for pattern in patterns {
        println!(
            "   {:>4} │ {:30} │ {:14} │ {:>5} │ {}",
            pattern.id,
            truncate(&pattern.pattern, 30),
            pattern.category.as_str(),
            pattern.times_used,
            pattern.confidence
        );
    }

    Ok(())
}

pub fn cmd_patterns_add(
    db: &Database,
    user_id: &str,
    pattern: &str,
    category_str: &str,
) -> Result<()> {
    let category: Category = category_str
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{} (see 'tally patterns --help')", e))?;

    ensure_local_user(db, user_id)?;
    let learned = db.upsert_pattern(user_id, pattern, category)?;
    println!(
        "✅ Learned '{}' -> {} (pattern #{}, used {} times)",
        learned.pattern, learned.category, learned.id, learned.times_used
    );

    Ok(())
}

pub fn cmd_patterns_delete(db: &Database, user_id: &str, id: i64) -> Result<()> {
    if !db.delete_pattern(user_id, id)? {
        anyhow::bail!("Pattern not found: {}", id);
    }
    println!("✅ Deleted pattern #{}", id);

    Ok(())
}

pub fn cmd_patterns_test(
    db: &Database,
    user_id: &str,
    description: &str,
    keyword_defaults: bool,
) -> Result<()> {
    let categorizer = Categorizer::load(db, user_id)?;
    let mut result = categorizer.preview(Some(description));
    if result.is_uncategorized() && keyword_defaults {
        if let Some(keyword) = keyword_category(description) {
            result = keyword;
        }
    }

    if result.is_uncategorized() {
        println!("No pattern matches \"{}\" (UNCATEGORIZED)", description);
        return Ok(());
    }

    println!("🔍 \"{}\"", description);
    println!("   Category:   {}", result.category);
    println!("   Confidence: {}", result.confidence);
    println!("   Source:     {}", result.source.as_str());
    if let Some(pattern) = &result.pattern {
        println!("   Matched:    {}", pattern);
    }

    Ok(())
}
