//! Inference oracles: turn a raw utterance into a partial query suggestion.
//!
//! [`QueryOracle`] is the seam the resolver calls through. [`RuleOracle`] is
//! the offline implementation: it matches the utterance against the
//! catalog's own vocabulary (vendors, categories, tags, brands, product-name
//! words) plus a fixed set of price and ordering phrases.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use grocer_catalog::CatalogStore;
use grocer_core::types::{dedup_terms, Price, PriceFilter, PriceOperator, SortKey, StructuredQuery};

use crate::error::ChatError;
use crate::resolver::find_vendor_reset;
use crate::types::{FieldUpdate, QuerySuggestion};

/// A text-understanding service that proposes a partial structured query.
///
/// Calls are blocking and may fail; the resolver treats a failure as an
/// empty suggestion.
pub trait QueryOracle: Send + Sync {
    fn suggest(
        &self,
        user_text: &str,
        prior: &StructuredQuery,
    ) -> Result<QuerySuggestion, ChatError>;

    /// Short identifier used in logs and the health endpoint.
    fn name(&self) -> &str;

    /// Whether the oracle has everything it needs (credentials etc.).
    fn is_configured(&self) -> bool {
        true
    }
}

// =============================================================================
// Fixed phrase patterns
// =============================================================================

static EXCLUDE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:not\s+(?:from|at|in)|except(?:\s+for)?|excluding|exclude|without|apart\s+from|other\s+than|but\s+not|not|no)\b",
    )
    .expect("Invalid exclusion marker regex")
});

static INCLUDE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:from|at|in|only)\b").expect("Invalid inclusion marker regex")
});

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(under|less\s+than|below|cheaper\s+than|at\s+most|up\s+to|no\s+more\s+than|max(?:imum)?|over|more\s+than|above|at\s+least|min(?:imum)?|exactly)\s+£?\s*(\d+(?:\.\d{1,2})?)(p\b)?",
    )
    .expect("Invalid price regex")
});

static SORT_DESC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:most\s+expensive|expensive|priciest|pricey|premium|luxury|fancy)\b")
        .expect("Invalid sort regex")
});

static SORT_ASC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:cheapest|cheap|budget|affordable|inexpensive|lowest\s+price)\b")
        .expect("Invalid sort regex")
});

static SORT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:alphabetical(?:ly)?|by\s+name|a\s*-\s*z)\b").expect("Invalid sort regex")
});

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'&-]*").expect("Invalid token regex"));

/// Words never treated as product keywords.
static STOPWORDS: &[&str] = &[
    "a", "all", "also", "an", "and", "any", "anything", "apart", "are", "at", "be", "beverages",
    "but", "can", "could", "do", "drinks", "every", "except", "excluding", "find", "food", "for",
    "from", "get", "give", "have", "i", "i'd", "i'm", "in", "instead", "is", "it", "item", "items",
    "just", "like", "me", "more", "no", "not", "now", "of", "on", "one", "ones", "only", "option",
    "options", "or", "other", "please", "price", "priced", "product", "products", "shop", "shops",
    "show", "some", "something", "store", "stores", "than", "that", "the", "them", "there",
    "these", "this", "those", "to", "vendor", "vendors", "want", "what", "with", "without", "you",
];

fn operator_for(phrase: &str) -> Option<PriceOperator> {
    let normalized = phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match normalized.as_str() {
        "under" | "less than" | "below" | "cheaper than" => Some(PriceOperator::Lt),
        "at most" | "up to" | "no more than" | "max" | "maximum" => Some(PriceOperator::Le),
        "over" | "more than" | "above" => Some(PriceOperator::Gt),
        "at least" | "min" | "minimum" => Some(PriceOperator::Ge),
        "exactly" => Some(PriceOperator::Eq),
        _ => None,
    }
}

// =============================================================================
// RuleOracle
// =============================================================================

/// A vocabulary term with its compiled matcher.
struct Term {
    canonical: String,
    pattern: Regex,
}

/// Offline oracle driven by the catalog vocabulary.
pub struct RuleOracle {
    vendors: Vec<Term>,
    categories: Vec<Term>,
    tags: Vec<Term>,
    brands: Vec<Term>,
    name_words: HashSet<String>,
}

impl RuleOracle {
    /// Build an oracle from explicit vocabularies.
    ///
    /// `names` are product names; their words (and brand words) become the
    /// keyword vocabulary.
    pub fn new(
        vendors: &[String],
        categories: &[String],
        tags: &[String],
        brands: &[String],
        names: &[String],
    ) -> Self {
        let mut name_words = HashSet::new();
        for text in names.iter().chain(brands.iter()) {
            for token in TOKEN_RE.find_iter(text) {
                name_words.insert(token.as_str().to_lowercase());
            }
        }

        Self {
            vendors: compile_terms(vendors, ""),
            categories: compile_terms(categories, "(?:s|es)?"),
            tags: compile_terms(tags, ""),
            brands: brands
                .iter()
                .filter_map(|b| {
                    let escaped = regex::escape(b.trim());
                    compile(
                        b,
                        &format!(r"(?i)\bby\s+{0}\b|\b{0}\s+brand\b|\bbrand\s+{0}\b", escaped),
                    )
                })
                .collect(),
            name_words,
        }
    }

    /// Build an oracle from everything the catalog knows.
    pub fn from_catalog(catalog: &CatalogStore) -> Self {
        let names: Vec<String> = catalog.products().iter().map(|p| p.name.clone()).collect();
        Self::new(
            &catalog.vendors(),
            &catalog.categories(),
            &catalog.tags(),
            &catalog.brands(),
            &names,
        )
    }

    /// Analyze an utterance. Never fails.
    pub fn analyze(&self, text: &str) -> QuerySuggestion {
        let mut consumed: Vec<(usize, usize)> = Vec::new();
        let mut suggestion = QuerySuggestion::default();

        if let Some(span) = find_vendor_reset(text) {
            suggestion.vendor_reset = true;
            consumed.push(span);
        }

        // Vendors: classify each mention by the nearest preceding marker.
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for (start, canonical) in find_mentions(&self.vendors, text, &mut consumed) {
            if is_excluded(&text[..start]) {
                exclude.push(canonical);
            } else {
                include.push(canonical);
            }
        }
        if !include.is_empty() {
            suggestion.vendors = FieldUpdate::Replace(dedup_terms(include));
        }
        if !exclude.is_empty() {
            suggestion.exclude_vendors = FieldUpdate::Replace(dedup_terms(exclude));
        }

        if let Some((canonical, start, end)) = self.brands.iter().find_map(|term| {
            term.pattern
                .find(text)
                .map(|m| (term.canonical.clone(), m.start(), m.end()))
        }) {
            suggestion.brand = FieldUpdate::Replace(Some(canonical));
            consumed.push((start, end));
        }

        let categories = collect_terms(&self.categories, text, &mut consumed);
        if !categories.is_empty() {
            suggestion.product_types = FieldUpdate::Replace(categories);
        }

        let tags = collect_terms(&self.tags, text, &mut consumed);
        if !tags.is_empty() {
            suggestion.tags = FieldUpdate::Replace(tags);
        }

        if let Some((pf, start, end)) = detect_price(text) {
            suggestion.price_filter = FieldUpdate::Replace(Some(pf));
            consumed.push((start, end));
        }

        if let Some((key, start, end)) = detect_sort(text) {
            suggestion.sort_by = FieldUpdate::Replace(Some(key));
            consumed.push((start, end));
        }

        let keywords = self.keywords(text, &consumed);
        if !keywords.is_empty() {
            suggestion.keywords = FieldUpdate::Replace(keywords);
        }

        suggestion
    }

    /// Leftover words that appear somewhere in a product name or brand,
    /// in the user's own spelling.
    fn keywords(&self, text: &str, consumed: &[(usize, usize)]) -> Vec<String> {
        let words = TOKEN_RE
            .find_iter(text)
            .filter(|m| !is_consumed(consumed, m.start(), m.end()))
            .map(|m| m.as_str())
            .filter(|w| w.chars().count() > 1)
            .filter(|w| {
                let lower = w.to_lowercase();
                !STOPWORDS.contains(&lower.as_str()) && self.name_words.contains(&lower)
            });
        dedup_terms(words)
    }
}

impl QueryOracle for RuleOracle {
    fn suggest(
        &self,
        user_text: &str,
        _prior: &StructuredQuery,
    ) -> Result<QuerySuggestion, ChatError> {
        let suggestion = self.analyze(user_text);
        debug!(?suggestion, "Rule oracle suggestion");
        Ok(suggestion)
    }

    fn name(&self) -> &str {
        "rules"
    }
}

fn compile(canonical: &str, pattern: &str) -> Option<Term> {
    match Regex::new(pattern) {
        Ok(pattern) => Some(Term {
            canonical: canonical.trim().to_string(),
            pattern,
        }),
        Err(e) => {
            warn!(term = canonical, error = %e, "Skipping vocabulary term");
            None
        }
    }
}

/// Compile whole-word, case-insensitive matchers. Longer terms come first so
/// "Pret A Manger" wins over "Pret".
fn compile_terms(values: &[String], suffix: &str) -> Vec<Term> {
    let mut values: Vec<&String> = values.iter().filter(|v| !v.trim().is_empty()).collect();
    values.sort_by_key(|v| std::cmp::Reverse(v.len()));
    values
        .into_iter()
        .filter_map(|value| {
            let trimmed = value.trim();
            let start = if starts_with_word_char(trimmed) { r"\b" } else { "" };
            let end = if ends_with_word_char(trimmed) { r"\b" } else { "" };
            compile(
                trimmed,
                &format!("(?i){}{}{}{}", start, regex::escape(trimmed), suffix, end),
            )
        })
        .collect()
}

/// Non-overlapping mentions of any term, in the order they appear in `text`.
fn find_mentions<'t>(
    terms: &'t [Term],
    text: &str,
    consumed: &mut Vec<(usize, usize)>,
) -> Vec<(usize, &'t str)> {
    let mut found = Vec::new();
    for term in terms {
        for m in term.pattern.find_iter(text) {
            if is_consumed(consumed, m.start(), m.end()) {
                continue;
            }
            consumed.push((m.start(), m.end()));
            found.push((m.start(), term.canonical.as_str()));
        }
    }
    found.sort_by_key(|&(start, _)| start);
    found
}

fn collect_terms(terms: &[Term], text: &str, consumed: &mut Vec<(usize, usize)>) -> Vec<String> {
    dedup_terms(
        find_mentions(terms, text, consumed)
            .into_iter()
            .map(|(_, canonical)| canonical),
    )
}

fn starts_with_word_char(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_')
}

fn ends_with_word_char(s: &str) -> bool {
    s.chars().last().is_some_and(|c| c.is_alphanumeric() || c == '_')
}

fn is_consumed(consumed: &[(usize, usize)], start: usize, end: usize) -> bool {
    consumed.iter().any(|&(s, e)| start < e && s < end)
}

/// True when the last vendor marker before a mention is an exclusion.
fn is_excluded(prefix: &str) -> bool {
    let last_exclude = EXCLUDE_MARKER_RE.find_iter(prefix).last().map(|m| m.end());
    let last_include = INCLUDE_MARKER_RE.find_iter(prefix).last().map(|m| m.end());
    match (last_exclude, last_include) {
        (Some(ex), Some(inc)) => ex >= inc,
        (Some(_), None) => true,
        _ => false,
    }
}

fn detect_price(text: &str) -> Option<(PriceFilter, usize, usize)> {
    let caps = PRICE_RE.captures(text)?;
    let whole = caps.get(0)?;
    let operator = operator_for(caps.get(1)?.as_str())?;
    let amount: f64 = caps.get(2)?.as_str().parse().ok()?;
    let amount = if caps.get(3).is_some() {
        amount / 100.0
    } else {
        amount
    };
    let value = Price::from_pounds(amount)?;
    Some((PriceFilter::new(operator, value), whole.start(), whole.end()))
}

fn detect_sort(text: &str) -> Option<(SortKey, usize, usize)> {
    [
        (&*SORT_DESC_RE, SortKey::PriceDesc),
        (&*SORT_ASC_RE, SortKey::PriceAsc),
        (&*SORT_NAME_RE, SortKey::Name),
    ]
    .into_iter()
    .find_map(|(re, key)| re.find(text).map(|m| (key, m.start(), m.end())))
}

// =============================================================================
// Tests
// =============================================================================
