//! Built-in keyword table used when no learned pattern matches
//!
//! Keywords match case-insensitively on word boundaries, so "irs" never fires
//! inside "FIRST" nor "rent" inside "CURRENT". The longest matching keyword
//! wins and table order breaks ties.

use std::sync::OnceLock;

use regex::Regex;

use crate::categorize::Categorization;
use crate::models::{Category, CategorySource, Confidence};

/// Default keywords per category
pub const DEFAULT_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::McaDebt,
        &[
            "daily ach",
            "merchant cash",
            "fundbox",
            "kabbage",
            "ondeck",
            "bluevine",
            "credibly",
            "rapid finance",
            "forward financing",
            "clearco",
            "shopify capital",
        ],
    ),
    (
        Category::LoanPayment,
        &[
            "loan pmt",
            "loan payment",
            "sba loan",
            "term loan",
            "lending club",
            "prosper",
            "funding circle",
        ],
    ),
    (Category::Rent, &["rent", "lease", "property mgmt", "landlord"]),
    (
        Category::Payroll,
        &[
            "payroll",
            "gusto",
            "adp",
            "paychex",
            "quickbooks payroll",
            "square payroll",
        ],
    ),
    (
        Category::Utilities,
        &[
            "electric",
            "gas bill",
            "water bill",
            "utility",
            "pge",
            "edison",
            "comcast",
            "at&t",
            "verizon",
        ],
    ),
    (
        Category::Insurance,
        &["insurance", "geico", "allstate", "progressive", "state farm"],
    ),
    (
        Category::Revenue,
        &[
            "deposit",
            "payment received",
            "stripe",
            "square",
            "paypal",
            "shopify",
            "amazon payout",
            "pos deposit",
        ],
    ),
    (
        Category::TransferIn,
        &["transfer from", "xfer from", "mobile deposit"],
    ),
    (Category::TransferOut, &["transfer to", "xfer to", "wire out"]),
    (
        Category::Tax,
        &["irs", "tax payment", "estimated tax", "state tax", "franchise tax"],
    ),
    (
        Category::CreditCard,
        &[
            "credit card",
            "amex",
            "chase card",
            "visa payment",
            "mastercard",
        ],
    ),
];

struct KeywordMatcher {
    category: Category,
    keyword: &'static str,
    regex: Regex,
}

fn matchers() -> &'static [KeywordMatcher] {
    static MATCHERS: OnceLock<Vec<KeywordMatcher>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        DEFAULT_KEYWORDS
            .iter()
            .flat_map(|(category, keywords)| {
                keywords.iter().copied().map(move |keyword| KeywordMatcher {
                    category: *category,
                    keyword,
                    regex: Regex::new(&format!(r"\b{}\b", regex::escape(keyword)))
                        .expect("escaped keyword is a valid regex"),
                })
            })
            .collect()
    })
}

/// Look a description up in the keyword table
pub fn keyword_category(description: &str) -> Option<Categorization> {
    let haystack = description.trim().to_lowercase();
    if haystack.is_empty() {
        return None;
    }

    let mut best: Option<(Category, &str)> = None;
    for m in matchers() {
        let longer = best.map_or(true, |(_, b)| m.keyword.len() > b.len());
        if longer && m.regex.is_match(&haystack) {
            best = Some((m.category, m.keyword));
        }
    }

    best.map(|(category, keyword)| Categorization {
        category,
        confidence: Confidence::FULL,
        source: CategorySource::Keyword,
        pattern_id: None,
        pattern: Some(keyword.to_string()),
    })
}
