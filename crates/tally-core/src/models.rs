//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Spending category assigned to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Merchant cash advance repayments (daily ACH debits)
    McaDebt,
    LoanPayment,
    Rent,
    Payroll,
    Utilities,
    Insurance,
    Revenue,
    TransferIn,
    TransferOut,
    Tax,
    CreditCard,
    OtherExpense,
    /// Nothing matched
    #[default]
    Uncategorized,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 13] = [
        Self::McaDebt,
        Self::LoanPayment,
        Self::Rent,
        Self::Payroll,
        Self::Utilities,
        Self::Insurance,
        Self::Revenue,
        Self::TransferIn,
        Self::TransferOut,
        Self::Tax,
        Self::CreditCard,
        Self::OtherExpense,
        Self::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::McaDebt => "MCA_DEBT",
            Self::LoanPayment => "LOAN_PAYMENT",
            Self::Rent => "RENT",
            Self::Payroll => "PAYROLL",
            Self::Utilities => "UTILITIES",
            Self::Insurance => "INSURANCE",
            Self::Revenue => "REVENUE",
            Self::TransferIn => "TRANSFER_IN",
            Self::TransferOut => "TRANSFER_OUT",
            Self::Tax => "TAX",
            Self::CreditCard => "CREDIT_CARD",
            Self::OtherExpense => "OTHER_EXPENSE",
            Self::Uncategorized => "UNCATEGORIZED",
        }
    }

    /// Categories that count toward the debt ratio of the health score
    pub fn is_debt(&self) -> bool {
        matches!(self, Self::McaDebt | Self::LoanPayment | Self::CreditCard)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .find(|c| c.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Certainty of a category assignment, always within [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const FULL: Confidence = Confidence(1.0);

    /// Validate a raw score
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(Error::InvalidData(format!(
                "Confidence must be between 0 and 1, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Clamp a raw score into range (NaN becomes zero)
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// How a category was chosen for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorySource {
    /// Matched one of the user's learned patterns
    Learned,
    /// Matched the built-in keyword table
    Keyword,
    /// Nothing matched
    Default,
    /// Set by a user correction
    Manual,
}

impl CategorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learned => "learned",
            Self::Keyword => "keyword",
            Self::Default => "default",
            Self::Manual => "manual",
        }
    }
}

/// A user account, owned by the external auth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Provider-issued identifier
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate metrics derived from a statement's transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSummary {
    /// Month of the latest transaction, e.g. "2026-02"
    pub statement_month: Option<String>,
    pub total_transactions: i64,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_cash_flow: f64,
    pub health_score: f64,
}

/// An uploaded bank statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: i64,
    pub user_id: String,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    #[serde(flatten)]
    pub summary: StatementSummary,
    /// Categorized rows as parsed at upload time (null in list views)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw_data: serde_json::Value,
}

/// A transaction belonging to a statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub statement_id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Negative = expense, positive = income
    pub amount: f64,
    pub category: Category,
    pub category_confidence: Confidence,
    /// True once a user has overridden the automatic category
    pub user_corrected: bool,
    pub created_at: DateTime<Utc>,
}

/// A categorized transaction ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category: Category,
    pub category_confidence: Confidence,
    pub source: CategorySource,
}

/// A user-taught keyword -> category association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub id: i64,
    pub user_id: String,
    /// Text matched (case-insensitively) against descriptions
    pub pattern: String,
    pub category: Category,
    /// How many times this pattern was taught or applied
    pub times_used: i64,
    pub confidence: Confidence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
