//! Response text for conversation turns.
//!
//! Wording only; which products are returned is decided by the engine.

use grocer_core::types::{RankedResult, StructuredQuery};

use crate::context::ContextState;
use crate::types::TurnResponse;

/// Confirmation returned by a reset command.
pub const RESET_MESSAGE: &str = "Context cleared! Starting fresh conversation.";

/// Shown when the filters match nothing.
pub const NO_RESULTS_MESSAGE: &str =
    "No products found matching your criteria. Try adjusting your search!";

/// Shown when the request could not be understood and nothing matched.
pub const MISUNDERSTOOD_MESSAGE: &str =
    "Sorry, I couldn't understand that request. Could you try rephrasing it?";

/// Shown when the turn could not be processed at all.
pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error processing your request.";

/// Builds user-facing messages for each kind of turn outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseGenerator;

impl ResponseGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Message for a searched turn.
    ///
    /// With results: the count, prefixed by the context summary when any
    /// filter is active. Without results: a hint to adjust the search, or an
    /// apology when the oracle failed.
    pub fn turn_message(
        &self,
        products: &[RankedResult],
        context: &ContextState,
        oracle_failed: bool,
    ) -> String {
        if products.is_empty() {
            return if oracle_failed {
                MISUNDERSTOOD_MESSAGE.to_string()
            } else {
                NO_RESULTS_MESSAGE.to_string()
            };
        }

        let found = self.found_message(products.len());
        if context.has_active_filters() {
            format!("{}\n\n{}", context.summarize(), found)
        } else {
            found
        }
    }

    /// `Found 1 product matching your search` / `Found 3 products ...`.
    pub fn found_message(&self, count: usize) -> String {
        let noun = if count == 1 { "product" } else { "products" };
        format!("Found {} {} matching your search", count, noun)
    }

    pub fn reset_response(&self) -> TurnResponse {
        TurnResponse {
            message: RESET_MESSAGE.to_string(),
            products: Vec::new(),
            filters_used: StructuredQuery::default(),
        }
    }

    /// The generic failure response: apology, no products.
    pub fn failure_response(&self) -> TurnResponse {
        TurnResponse {
            message: APOLOGY_MESSAGE.to_string(),
            products: Vec::new(),
            filters_used: StructuredQuery::default(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use grocer_core::types::{Price, ProductRecord, SortKey};

    fn result(name: &str) -> RankedResult {
        RankedResult {
            product: ProductRecord {
                id: name.to_lowercase(),
                name: name.to_string(),
                brand: "Brand".to_string(),
                price: Price::from_pence(100),
                vendor: "ASDA".to_string(),
                category: "snack".to_string(),
                tags: vec![],
                calories: None,
                image: None,
            },
            reason: "matches your search".to_string(),
        }
    }

    #[test]
    fn test_found_message_pluralization() {
        let gen = ResponseGenerator::new();
        assert_eq!(gen.found_message(1), "Found 1 product matching your search");
        assert_eq!(gen.found_message(3), "Found 3 products matching your search");
    }

    #[test]
    fn test_turn_message_with_context_prefix() {
        let mut ctx = ContextState::new();
        ctx.set(StructuredQuery {
            vendors: vec!["Subway".into()],
            sort_by: Some(SortKey::PriceAsc),
            ..Default::default()
        });
        let msg = ResponseGenerator::new().turn_message(&[result("Crisps")], &ctx, false);
        assert_eq!(
            msg,
            "Context: Shop: Subway | Budget: cheap\n\nFound 1 product matching your search"
        );
    }

    #[test]
    fn test_turn_message_without_context() {
        let ctx = ContextState::new();
        let msg = ResponseGenerator::new().turn_message(&[result("A"), result("B")], &ctx, false);
        assert_eq!(msg, "Found 2 products matching your search");
    }

    #[test]
    fn test_turn_message_no_results() {
        let ctx = ContextState::new();
        let gen = ResponseGenerator::new();
        assert_eq!(gen.turn_message(&[], &ctx, false), NO_RESULTS_MESSAGE);
        assert_eq!(gen.turn_message(&[], &ctx, true), MISUNDERSTOOD_MESSAGE);
    }

    #[test]
    fn test_reset_and_failure_responses() {
        let gen = ResponseGenerator::new();
        let reset = gen.reset_response();
        assert_eq!(reset.message, RESET_MESSAGE);
        assert!(reset.products.is_empty());
        assert!(reset.filters_used.is_empty());

        let failure = gen.failure_response();
        assert_eq!(failure.message, APOLOGY_MESSAGE);
        assert!(failure.products.is_empty());
    }
}
