//! Context-merging query resolver.
//!
//! Combines the oracle's partial suggestion for a new utterance with the
//! prior structured query:
//!
//! 1. fields the suggestion does not mention are inherited;
//! 2. fields it mentions replace the inherited value;
//! 3. an explicit vendor inclusion clears exclusions and vice versa;
//! 4. a vendor reset phrase clears both vendor lists;
//! 5. generic category phrases expand to a fixed set of product types;
//! 6. a product-type assertion drops inherited tags and keywords.
//!
//! The resolver never fails. An oracle error degrades to an empty suggestion
//! and is reported through [`Resolution::oracle_failed`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use grocer_core::types::{dedup_terms, same_terms, StructuredQuery};

use crate::oracle::QueryOracle;
use crate::types::{FieldUpdate, QuerySuggestion};

/// Generic phrase → concrete product types. Extend by adding rows.
static FUZZY_CATEGORIES: &[(&str, &[&str])] = &[
    ("food items", &["sandwich", "bagel", "snack", "salad"]),
    ("food", &["sandwich", "bagel", "snack", "salad"]),
    ("beverages", &["drink"]),
    ("drinks", &["drink"]),
];

/// Phrases meaning "drop every vendor constraint".
static VENDOR_RESET_PHRASES: &[&str] = &[
    "all shops",
    "any shop",
    "all vendors",
    "any vendor",
    "all stores",
    "any store",
    "every shop",
    "every store",
    "every vendor",
];

static FUZZY_PATTERNS: LazyLock<Vec<(Regex, &'static [&'static str])>> = LazyLock::new(|| {
    FUZZY_CATEGORIES
        .iter()
        .map(|(phrase, types)| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase)))
                .expect("Invalid fuzzy category regex");
            (re, *types)
        })
        .collect()
});

/// Each phrase matches with any whitespace run and with the noun singular
/// or plural ("any shops", "all shop").
static VENDOR_RESET_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = VENDOR_RESET_PHRASES
        .iter()
        .map(|p| {
            let words: Vec<String> = p.split_whitespace().map(regex::escape).collect();
            format!("{}s?", words.join(r"\s+").trim_end_matches('s'))
        })
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
        .expect("Invalid vendor reset regex")
});

/// The outcome of resolving one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The new conversation state.
    pub query: StructuredQuery,
    /// The oracle failed and an empty suggestion was used instead.
    pub oracle_failed: bool,
}

/// Merges oracle suggestions into the running conversation state.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryResolver;

impl QueryResolver {
    pub fn new() -> Self {
        Self
    }

    /// Ask the oracle about `user_text` and merge its answer into `prior`.
    pub fn resolve(
        &self,
        user_text: &str,
        prior: &StructuredQuery,
        oracle: &dyn QueryOracle,
    ) -> Resolution {
        let (suggestion, oracle_failed) = match oracle.suggest(user_text, prior) {
            Ok(s) => {
                if s.is_empty() {
                    debug!(oracle = oracle.name(), "Oracle suggested no changes");
                }
                (s, false)
            }
            Err(e) => {
                warn!(oracle = oracle.name(), error = %e, "Oracle failed, using empty suggestion");
                (QuerySuggestion::default(), true)
            }
        };

        let query = self.merge(user_text, prior, suggestion);
        debug!(?query, oracle_failed, "Query resolved");
        Resolution {
            query,
            oracle_failed,
        }
    }

    /// Apply the inheritance, override, exclusion, reset, expansion and
    /// cascade rules. Pure; exposed for callers that already hold a
    /// suggestion.
    pub fn merge(
        &self,
        user_text: &str,
        prior: &StructuredQuery,
        suggestion: QuerySuggestion,
    ) -> StructuredQuery {
        let sets_vendors = suggestion.vendors.sets_non_empty();
        let sets_exclusions = suggestion.exclude_vendors.sets_non_empty();
        let asserts_types = suggestion.product_types.sets_non_empty();
        let explicit_tags = !suggestion.tags.is_inherit();
        let explicit_keywords = !suggestion.keywords.is_inherit();
        let vendor_reset = suggestion.vendor_reset || mentions_vendor_reset(user_text);
        let fuzzy = expand_fuzzy(user_text, suggestion.product_types.as_replace());

        let mut query = StructuredQuery {
            vendors: suggestion.vendors.apply(prior.vendors.clone()),
            exclude_vendors: suggestion
                .exclude_vendors
                .apply(prior.exclude_vendors.clone()),
            product_types: suggestion
                .product_types
                .apply(prior.product_types.clone()),
            brand: suggestion.brand.apply(prior.brand.clone()),
            tags: suggestion.tags.apply(prior.tags.clone()),
            price_filter: suggestion.price_filter.apply(prior.price_filter),
            sort_by: suggestion.sort_by.apply(prior.sort_by),
            keywords: suggestion.keywords.apply(prior.keywords.clone()),
        };

        // An exclusion in the same turn as an inclusion wins.
        if sets_exclusions {
            query.vendors.clear();
        } else if sets_vendors {
            query.exclude_vendors.clear();
        }
        if !query.vendors.is_empty() && !query.exclude_vendors.is_empty() {
            query.vendors.clear();
        }

        if vendor_reset {
            query.vendors.clear();
            query.exclude_vendors.clear();
        }

        if let Some(types) = &fuzzy {
            query.product_types = types.clone();
        }

        let type_changed = fuzzy.is_some()
            || asserts_types
            || !same_terms(&query.product_types, &prior.product_types);
        if type_changed {
            if !explicit_tags {
                query.tags.clear();
            }
            if !explicit_keywords {
                query.keywords.clear();
            }
        }

        query.normalized()
    }
}

/// True when the utterance contains a vendor reset phrase.
pub fn mentions_vendor_reset(user_text: &str) -> bool {
    VENDOR_RESET_RE.is_match(user_text)
}

/// Byte span of the first vendor reset phrase in the utterance.
pub(crate) fn find_vendor_reset(user_text: &str) -> Option<(usize, usize)> {
    VENDOR_RESET_RE
        .find(user_text)
        .map(|m| (m.start(), m.end()))
}

/// Expand generic category phrases found in the utterance or among the
/// suggested product types.
///
/// Returns `None` when no phrase matched. Otherwise the union of every
/// matched expansion in table order, followed by any concrete types the
/// suggestion named alongside them.
pub fn expand_fuzzy(user_text: &str, suggested: Option<&Vec<String>>) -> Option<Vec<String>> {
    let mut expanded: Vec<String> = Vec::new();
    let mut matched = false;

    for ((phrase, _), (re, types)) in FUZZY_CATEGORIES.iter().zip(FUZZY_PATTERNS.iter()) {
        let in_suggestion = suggested
            .map(|s| s.iter().any(|t| t.trim().eq_ignore_ascii_case(phrase)))
            .unwrap_or(false);
        if re.is_match(user_text) || in_suggestion {
            matched = true;
            expanded.extend(types.iter().map(|t| t.to_string()));
        }
    }

    if !matched {
        return None;
    }

    if let Some(suggested) = suggested {
        let concrete = suggested.iter().filter(|t| {
            !FUZZY_CATEGORIES
                .iter()
                .any(|(phrase, _)| t.trim().eq_ignore_ascii_case(phrase))
        });
        expanded.extend(concrete.cloned());
    }

    Some(dedup_terms(expanded))
}

// =============================================================================
// Tests
// =============================================================================
