//! Deterministic filter and rank engine.
//!
//! Applies every active clause of a [`StructuredQuery`] to the catalog,
//! sorts the survivors, annotates each with a reason and only then
//! truncates, so the top-N is always the head of the full ranking.

use std::cmp::Ordering;

use grocer_core::types::{ProductRecord, RankedResult, SortKey, StructuredQuery};

/// Separator between individual reason fragments.
const REASON_SEPARATOR: &str = " · ";

/// Reason used when no other annotation applies.
const GENERIC_REASON: &str = "matches your search";

/// Stateless search over a slice of catalog records.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterEngine;

impl FilterEngine {
    pub fn new() -> Self {
        Self
    }

    /// Filter, sort, annotate and truncate.
    ///
    /// An all-empty query returns nothing rather than the whole catalog.
    pub fn search(
        &self,
        query: &StructuredQuery,
        catalog: &[ProductRecord],
        limit: usize,
    ) -> Vec<RankedResult> {
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut matched: Vec<&ProductRecord> =
            catalog.iter().filter(|p| self.matches(query, p)).collect();

        if let Some(key) = query.sort_by {
            // sort_by is stable, so equal keys keep catalog order
            matched.sort_by(|a, b| compare(key, a, b));
        }

        matched
            .into_iter()
            .enumerate()
            .map(|(rank, product)| RankedResult {
                reason: reason_for(query, product, rank),
                product: product.clone(),
            })
            .take(limit)
            .collect()
    }

    /// Whether a single record satisfies every active clause.
    pub fn matches(&self, query: &StructuredQuery, product: &ProductRecord) -> bool {
        if !query.vendors.is_empty() && !contains_ci(&query.vendors, &product.vendor) {
            return false;
        }
        if !query.exclude_vendors.is_empty() && contains_ci(&query.exclude_vendors, &product.vendor)
        {
            return false;
        }
        if !query.product_types.is_empty() && !contains_ci(&query.product_types, &product.category)
        {
            return false;
        }
        if let Some(brand) = &query.brand {
            if !product
                .brand
                .to_lowercase()
                .contains(&brand.to_lowercase())
            {
                return false;
            }
        }
        if !query.tags.iter().all(|tag| product.has_tag(tag)) {
            return false;
        }
        if let Some(pf) = &query.price_filter {
            if !pf.matches(product.price) {
                return false;
            }
        }
        if !query.keywords.is_empty() {
            let name = product.name.to_lowercase();
            let brand = product.brand.to_lowercase();
            let hit = query.keywords.iter().any(|kw| {
                let kw = kw.to_lowercase();
                name.contains(&kw) || brand.contains(&kw)
            });
            if !hit {
                return false;
            }
        }
        true
    }
}

fn contains_ci(values: &[String], needle: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(needle))
}

fn compare(key: SortKey, a: &ProductRecord, b: &ProductRecord) -> Ordering {
    match key {
        SortKey::PriceAsc => a.price.cmp(&b.price).then_with(|| a.cmp_by_name(b)),
        SortKey::PriceDesc => b.price.cmp(&a.price).then_with(|| a.cmp_by_name(b)),
        SortKey::Name => a.cmp_by_name(b),
    }
}

/// Build the reason for the result at `rank` in the full sorted list.
fn reason_for(query: &StructuredQuery, product: &ProductRecord, rank: usize) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(pf) = &query.price_filter {
        parts.push(pf.describe());
    }

    if !query.tags.is_empty() {
        let matched: Vec<&str> = product
            .tags
            .iter()
            .filter(|t| contains_ci(&query.tags, t))
            .map(String::as_str)
            .collect();
        parts.push(format!("tagged {}", matched.join(", ")));
    }

    if rank == 0 && query.price_filter.is_none() {
        match query.sort_by {
            Some(SortKey::PriceAsc) => parts.push("cheapest option".to_string()),
            Some(SortKey::PriceDesc) => parts.push("most expensive option".to_string()),
            _ => {}
        }
    }

    if parts.is_empty() {
        GENERIC_REASON.to_string()
    } else {
        parts.join(REASON_SEPARATOR)
    }
}

// =============================================================================
// Tests
// =============================================================================
