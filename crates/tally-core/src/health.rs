//! Statement aggregates and the financial health score

use chrono::NaiveDate;

use crate::models::{Category, NewTransaction, StatementSummary, Transaction};

/// Descriptions containing any of these count as an overdraft event
const DISTRESS_MARKERS: [&str; 3] = ["nsf", "overdraft", "insufficient"];

/// The fields of a transaction that feed the aggregates
#[derive(Debug, Clone, Copy)]
pub struct SummaryRow<'a> {
    pub date: NaiveDate,
    pub description: &'a str,
    pub amount: f64,
    pub category: Category,
}

impl<'a> From<&'a NewTransaction> for SummaryRow<'a> {
    fn from(t: &'a NewTransaction) -> Self {
        Self {
            date: t.date,
            description: &t.description,
            amount: t.amount,
            category: t.category,
        }
    }
}

impl<'a> From<&'a Transaction> for SummaryRow<'a> {
    fn from(t: &'a Transaction) -> Self {
        Self {
            date: t.date,
            description: &t.description,
            amount: t.amount,
            category: t.category,
        }
    }
}

/// Score a statement from 0 (distressed) to 100 (healthy)
///
/// Deductions from 100:
/// - revenue/expense ratio below 1: 30, below 1.5: 15
/// - debt payments over 30% of revenue: 25, over 15%: 12
/// - amount std-dev over twice the mean: 20, over the mean: 10
/// - 5 per NSF/overdraft row, at most 15
/// - more than 70% of rows are debits: 10
pub fn health_score(rows: &[SummaryRow<'_>]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }

    let mut score = 100.0;

    let revenue: f64 = rows.iter().map(|r| r.amount).filter(|a| *a > 0.0).sum();
    let expenses: f64 = rows
        .iter()
        .map(|r| r.amount)
        .filter(|a| *a < 0.0)
        .sum::<f64>()
        .abs();

    if expenses > 0.0 {
        let ratio = revenue / expenses;
        if ratio < 1.0 {
            score -= 30.0;
        } else if ratio < 1.5 {
            score -= 15.0;
        }
    }

    let debt: f64 = rows
        .iter()
        .filter(|r| r.category.is_debt())
        .map(|r| r.amount)
        .sum::<f64>()
        .abs();
    let debt_ratio = if revenue > 0.0 { debt / revenue } else { 1.0 };
    if debt_ratio > 0.3 {
        score -= 25.0;
    } else if debt_ratio > 0.15 {
        score -= 12.0;
    }

    // Sample standard deviation; undefined for a single row
    if rows.len() > 1 {
        let n = rows.len() as f64;
        let mean = rows.iter().map(|r| r.amount).sum::<f64>() / n;
        let variance = rows
            .iter()
            .map(|r| (r.amount - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        let std_dev = variance.sqrt();

        if std_dev > mean.abs() * 2.0 {
            score -= 20.0;
        } else if std_dev > mean.abs() {
            score -= 10.0;
        }
    }

    let distress = rows
        .iter()
        .filter(|r| {
            let lower = r.description.to_lowercase();
            DISTRESS_MARKERS.iter().any(|m| lower.contains(m))
        })
        .count();
    score -= (distress as f64 * 5.0).min(15.0);

    let debits = rows.iter().filter(|r| r.amount < 0.0).count();
    if debits as f64 > rows.len() as f64 * 0.7 {
        score -= 10.0;
    }

    f64::clamp(score, 0.0, 100.0)
}

/// Derive every statement aggregate from its rows
pub fn summarize(rows: &[SummaryRow<'_>]) -> StatementSummary {
    let total_revenue: f64 = rows.iter().map(|r| r.amount).filter(|a| *a > 0.0).sum();
    let total_expenses: f64 = rows
        .iter()
        .map(|r| r.amount)
        .filter(|a| *a < 0.0)
        .sum::<f64>()
        .abs();

    StatementSummary {
        statement_month: rows
            .iter()
            .map(|r| r.date)
            .max()
            .map(|d| d.format("%Y-%m").to_string()),
        total_transactions: rows.len() as i64,
        total_revenue,
        total_expenses,
        net_cash_flow: total_revenue - total_expenses,
        health_score: health_score(rows),
    }
}
