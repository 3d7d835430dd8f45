//! Pattern-based transaction categorization
//!
//! A description is matched against the user's learned patterns by
//! case-insensitive substring containment. When several patterns match, the
//! longest pattern text wins, then the highest confidence, then the lowest id.
//! Nothing matching (or nothing to match) yields [`Category::Uncategorized`]
//! with zero confidence.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{Category, CategorySource, Confidence, LearnedPattern};
use crate::store::PatternStore;

/// Outcome of categorizing one description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Categorization {
    pub category: Category,
    pub confidence: Confidence,
    pub source: CategorySource,
    /// Id of the pattern that matched, if any
    pub pattern_id: Option<i64>,
    /// Text of the pattern that matched, if any
    pub pattern: Option<String>,
}

impl Categorization {
    pub fn uncategorized() -> Self {
        Self {
            category: Category::Uncategorized,
            confidence: Confidence::ZERO,
            source: CategorySource::Default,
            pattern_id: None,
            pattern: None,
        }
    }

    fn learned(pattern: &LearnedPattern) -> Self {
        Self {
            category: pattern.category,
            confidence: pattern.confidence,
            source: CategorySource::Learned,
            pattern_id: Some(pattern.id),
            pattern: Some(pattern.pattern.clone()),
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.pattern_id.is_none() && self.category == Category::Uncategorized
    }
}

/// Precedence between two matching patterns: longer text, then higher confidence, then lower id
fn precedence(a: &LearnedPattern, b: &LearnedPattern) -> Ordering {
    let len = |p: &LearnedPattern| p.pattern.trim().chars().count();
    len(a)
        .cmp(&len(b))
        .then_with(|| {
            a.confidence
                .value()
                .partial_cmp(&b.confidence.value())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.id.cmp(&a.id))
}

/// Find the pattern that decides a description's category, without side effects
pub fn best_match<'p>(patterns: &'p [LearnedPattern], description: &str) -> Option<&'p LearnedPattern> {
    let haystack = description.trim().to_lowercase();
    if haystack.is_empty() {
        return None;
    }

    patterns
        .iter()
        .filter(|p| {
            let needle = p.pattern.trim().to_lowercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .max_by(|a, b| precedence(a, b))
}

/// Categorizer bound to one user's patterns, loaded once per import or request
pub struct Categorizer<'s, S: PatternStore + ?Sized> {
    store: &'s S,
    user_id: String,
    patterns: Vec<LearnedPattern>,
}

impl<'s, S: PatternStore + ?Sized> Categorizer<'s, S> {
    /// Load the user's patterns from the store
    pub fn load(store: &'s S, user_id: &str) -> Result<Self> {
        let patterns = store.patterns_for_user(user_id)?;
        debug!("Loaded {} patterns for {}", patterns.len(), user_id);
        Ok(Self::with_patterns(store, user_id, patterns))
    }

    /// Use an already-loaded pattern set
    pub fn with_patterns(store: &'s S, user_id: &str, patterns: Vec<LearnedPattern>) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
            patterns,
        }
    }

    pub fn patterns(&self) -> &[LearnedPattern] {
        &self.patterns
    }

    /// What `categorize` would return, without counting the use
    pub fn preview(&self, description: Option<&str>) -> Categorization {
        description
            .and_then(|d| best_match(&self.patterns, d))
            .map(Categorization::learned)
            .unwrap_or_else(Categorization::uncategorized)
    }

    /// Categorize a description, recording a use of the matching pattern
    pub fn categorize(&mut self, description: Option<&str>) -> Result<Categorization> {
        let result = self.preview(description);

        if let Some(pattern_id) = result.pattern_id {
            let times_used = self.store.record_pattern_use(&self.user_id, pattern_id)?;
            if let Some(p) = self.patterns.iter_mut().find(|p| p.id == pattern_id) {
                p.times_used = times_used;
            }
            debug!(
                "'{}' matched pattern {} -> {}",
                description.unwrap_or_default(),
                pattern_id,
                result.category
            );
        }

        Ok(result)
    }
}
