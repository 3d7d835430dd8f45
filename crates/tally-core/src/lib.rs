//! Tally Core Library
//!
//! Shared functionality for the Tally statement categorizer:
//! - Database access and migrations
//! - Pattern and record store capabilities
//! - Learned-pattern categorizer with a built-in keyword fallback
//! - Statement import from CSV, text and PDF documents
//! - Statement aggregates and health score
//! - Credential verification against a hosted auth provider

pub mod auth;
pub mod categorize;
pub mod config;
pub mod corrections;
pub mod db;
pub mod error;
pub mod health;
pub mod import;
pub mod keywords;
pub mod models;
pub mod store;

/// Test utilities including a mock auth provider
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use auth::{
    validate_signup, AuthClient, AuthSession, AuthUser, CredentialVerifier, HostedVerifier,
    MemoryVerifier,
};
pub use categorize::{best_match, Categorization, Categorizer};
pub use config::{AuthConfig, Config};
pub use corrections::{correct_transaction, Correction};
pub use db::Database;
pub use error::{Error, Result};
pub use health::{health_score, summarize, SummaryRow};
pub use import::{
    CategoryBreakdown, DocumentFormat, ImportOptions, ImportOutcome, RawRow, RowError, RowResult,
    SkippedRow, StatementImporter,
};
pub use keywords::keyword_category;
pub use models::{
    Category, CategorySource, Confidence, LearnedPattern, NewTransaction, Statement,
    StatementSummary, Transaction, User,
};
pub use store::{PatternStore, PatternUses, RecordStore, SEED_CONFIDENCE};
