//! Conversation context state.
//!
//! Holds the active filter set carried between turns together with the last
//! raw utterance. The state is replaced wholesale after every merge and
//! cleared on reset; it is never patched field by field from outside.

use grocer_core::types::{PriceOperator, SortKey, StructuredQuery};

/// Active filters for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextState {
    query: StructuredQuery,
    last_utterance: Option<String>,
}

impl ContextState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current structured query.
    pub fn get(&self) -> StructuredQuery {
        self.query.clone()
    }

    /// Borrow the current structured query.
    pub fn query(&self) -> &StructuredQuery {
        &self.query
    }

    /// Replace the active query.
    pub fn set(&mut self, query: StructuredQuery) {
        self.query = query;
    }

    /// Replace the active query and remember the utterance that produced it.
    pub fn record_turn(&mut self, utterance: &str, query: StructuredQuery) {
        self.query = query;
        self.last_utterance = Some(utterance.to_string());
    }

    pub fn last_utterance(&self) -> Option<&str> {
        self.last_utterance.as_deref()
    }

    /// True iff any field of the active query is set.
    pub fn has_active_filters(&self) -> bool {
        !self.query.is_empty()
    }

    /// Clear back to the all-empty query.
    pub fn reset(&mut self) {
        self.query = StructuredQuery::default();
        self.last_utterance = None;
    }

    /// Human-readable summary of the active constraints, e.g.
    /// `Context: Shop: Subway | Budget: cheap`.
    ///
    /// Returns an empty string when nothing is active.
    pub fn summarize(&self) -> String {
        let q = &self.query;
        let mut parts: Vec<String> = Vec::new();

        if !q.vendors.is_empty() {
            parts.push(format!("Shop: {}", q.vendors.join(", ")));
        }
        if !q.exclude_vendors.is_empty() {
            parts.push(format!("Excluding: {}", q.exclude_vendors.join(", ")));
        }
        if !q.product_types.is_empty() {
            parts.push(format!("Type: {}", q.product_types.join(", ")));
        }
        if let Some(brand) = &q.brand {
            parts.push(format!("Brand: {}", brand));
        }
        if !q.tags.is_empty() {
            parts.push(format!("Tags: {}", q.tags.join(", ")));
        }
        if !q.keywords.is_empty() {
            parts.push(format!("Looking for: {}", q.keywords.join(", ")));
        }

        match (&q.price_filter, q.sort_by) {
            (Some(pf), _) => {
                let bound = match pf.operator {
                    PriceOperator::Lt => "under",
                    PriceOperator::Le => "≤",
                    PriceOperator::Gt => "over",
                    PriceOperator::Ge => "≥",
                    PriceOperator::Eq => "=",
                };
                parts.push(format!("Price: {} {}", bound, pf.value));
            }
            (None, Some(SortKey::PriceDesc)) => parts.push("Budget: expensive".to_string()),
            (None, Some(SortKey::PriceAsc)) => parts.push("Budget: cheap".to_string()),
            (None, Some(SortKey::Name)) | (None, None) => {}
        }
        if q.sort_by == Some(SortKey::Name) {
            parts.push("Order: alphabetical".to_string());
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("Context: {}", parts.join(" | "))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
