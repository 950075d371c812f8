//! Session orchestrator: entry point for one conversation.
//!
//! Routes reset commands, otherwise sequences resolver, context update,
//! engine and response assembly. The session lock is held for the whole
//! turn, so turns are strictly sequential.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use grocer_catalog::CatalogStore;
use grocer_core::config::ChatConfig;
use grocer_core::types::StructuredQuery;

use crate::context::ContextState;
use crate::engine::FilterEngine;
use crate::error::ChatError;
use crate::oracle::QueryOracle;
use crate::resolver::QueryResolver;
use crate::response::ResponseGenerator;
use crate::types::{ChatMessage, MessageRole, TurnResponse};

/// Mutable per-conversation state.
#[derive(Debug, Default)]
struct Session {
    context: ContextState,
    history: Vec<ChatMessage>,
}

impl Session {
    /// Append to the transcript, dropping the oldest messages past `max`.
    fn record(&mut self, message: ChatMessage, max: usize) {
        self.history.push(message);
        if self.history.len() > max {
            let excess = self.history.len() - max;
            self.history.drain(..excess);
        }
    }
}

/// Coordinates one conversation over a shared catalog and oracle.
pub struct SessionOrchestrator {
    catalog: Arc<CatalogStore>,
    oracle: Arc<dyn QueryOracle>,
    resolver: QueryResolver,
    engine: FilterEngine,
    response_generator: ResponseGenerator,
    session: Mutex<Session>,
    config: ChatConfig,
}

impl SessionOrchestrator {
    pub fn new(
        config: ChatConfig,
        catalog: Arc<CatalogStore>,
        oracle: Arc<dyn QueryOracle>,
    ) -> Self {
        Self {
            catalog,
            oracle,
            resolver: QueryResolver::new(),
            engine: FilterEngine::new(),
            response_generator: ResponseGenerator::new(),
            session: Mutex::new(Session::default()),
            config,
        }
    }

    /// Process one user message.
    ///
    /// Only input validation produces an `Err`. Everything after validation
    /// yields a response; internal failures become the generic apology.
    pub fn handle_turn(&self, user_text: &str) -> Result<TurnResponse, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }
        let text = user_text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }

        let mut session = match self.lock_session() {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Turn aborted");
                return Ok(self.response_generator.failure_response());
            }
        };

        if self.is_reset_command(text) {
            session.context.reset();
            session.history.clear();
            info!("Conversation reset by command");
            return Ok(self.response_generator.reset_response());
        }

        let resolution = self
            .resolver
            .resolve(text, session.context.query(), self.oracle.as_ref());
        session.context.record_turn(text, resolution.query.clone());

        let products = self.engine.search(
            &resolution.query,
            self.catalog.products(),
            self.config.result_limit,
        );
        let message = self.response_generator.turn_message(
            &products,
            &session.context,
            resolution.oracle_failed,
        );

        debug!(
            results = products.len(),
            oracle_failed = resolution.oracle_failed,
            filters = ?resolution.query,
            utterance = session.context.last_utterance().unwrap_or_default(),
            "Turn complete"
        );

        let max_history = self.config.max_history;
        session.record(ChatMessage::new(MessageRole::User, text), max_history);
        session.record(
            ChatMessage::new(MessageRole::Assistant, message.clone()),
            max_history,
        );

        Ok(TurnResponse {
            message,
            products,
            filters_used: resolution.query,
        })
    }

    /// Clear the active filters and the transcript.
    ///
    /// The session is replaced wholesale, so this also recovers a lock
    /// poisoned by a panicking turn.
    pub fn reset_session(&self) -> Result<(), ChatError> {
        let mut session = self.session.lock().unwrap_or_else(|poisoned| {
            warn!("Session lock poisoned, recovering on reset");
            self.session.clear_poison();
            poisoned.into_inner()
        });
        *session = Session::default();
        info!("Conversation reset");
        Ok(())
    }

    /// The active structured query.
    pub fn context(&self) -> Result<StructuredQuery, ChatError> {
        Ok(self.lock_session()?.context.get())
    }

    /// Human-readable summary of the active filters.
    pub fn context_summary(&self) -> Result<String, ChatError> {
        Ok(self.lock_session()?.context.summarize())
    }

    /// Transcript messages, oldest first.
    pub fn history(&self) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.lock_session()?.history.clone())
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    pub fn oracle_configured(&self) -> bool {
        self.oracle.is_configured()
    }

    fn is_reset_command(&self, text: &str) -> bool {
        self.config
            .reset_keywords
            .iter()
            .any(|k| k.trim().eq_ignore_ascii_case(text))
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Session>, ChatError> {
        self.session
            .lock()
            .map_err(|e| ChatError::StateError(format!("session lock poisoned: {}", e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::RuleOracle;
    use crate::response::{
        APOLOGY_MESSAGE, MISUNDERSTOOD_MESSAGE, NO_RESULTS_MESSAGE, RESET_MESSAGE,
    };
    use crate::types::QuerySuggestion;
    use grocer_core::types::{Price, ProductRecord, SortKey};

    fn product(
        id: &str,
        name: &str,
        brand: &str,
        vendor: &str,
        category: &str,
        pence: u64,
        tags: &[&str],
    ) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: name.to_string(),
            brand: brand.to_string(),
            price: Price::from_pence(pence),
            vendor: vendor.to_string(),
            category: category.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            calories: None,
            image: None,
        }
    }

    fn catalog() -> Arc<CatalogStore> {
        Arc::new(
            CatalogStore::from_records(vec![
                product("1", "Coke Zero 330ml", "Coca-Cola", "ASDA", "drink", 125, &["vegan"]),
                product("2", "Pepsi Max 330ml", "Pepsi", "ASDA", "drink", 110, &["vegan"]),
                product("3", "Diet Coke 500ml", "Coca-Cola", "Subway", "drink", 150, &["vegan"]),
                product("4", "Pepsi 500ml", "Pepsi", "Subway", "drink", 160, &[]),
                product("5", "Veggie Delite", "Subway", "Subway", "sandwich", 450, &["vegan"]),
                product("6", "Italian BMT", "Subway", "Subway", "sandwich", 549, &[]),
                product("7", "Plain Bagel", "Tesco", "Tesco", "bagel", 90, &["vegetarian"]),
            ])
            .unwrap(),
        )
    }

    fn orchestrator_with(config: ChatConfig) -> SessionOrchestrator {
        let catalog = catalog();
        let oracle = Arc::new(RuleOracle::from_catalog(&catalog));
        SessionOrchestrator::new(config, catalog, oracle)
    }

    fn orchestrator() -> SessionOrchestrator {
        orchestrator_with(ChatConfig::default())
    }

    struct FailingOracle;

    impl QueryOracle for FailingOracle {
        fn suggest(&self, _: &str, _: &StructuredQuery) -> Result<QuerySuggestion, ChatError> {
            Err(ChatError::Oracle("service unavailable".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn is_configured(&self) -> bool {
            false
        }
    }

    // ---- Validation ----

    #[test]
    fn test_disabled_returns_error() {
        let orch = orchestrator_with(ChatConfig {
            enabled: false,
            ..ChatConfig::default()
        });
        assert!(matches!(orch.handle_turn("coke"), Err(ChatError::Disabled)));
    }

    #[test]
    fn test_empty_and_whitespace_messages_rejected() {
        let orch = orchestrator();
        assert!(matches!(orch.handle_turn(""), Err(ChatError::EmptyMessage)));
        assert!(matches!(
            orch.handle_turn("   \n\t"),
            Err(ChatError::EmptyMessage)
        ));
        assert!(orch.history().unwrap().is_empty());
    }

    #[test]
    fn test_message_too_long_returns_error() {
        let orch = orchestrator_with(ChatConfig {
            max_message_length: 10,
            ..ChatConfig::default()
        });
        assert!(matches!(
            orch.handle_turn("this is far too long"),
            Err(ChatError::MessageTooLong(10))
        ));
        // Multi-byte characters are counted as characters.
        assert!(orch.handle_turn("££££££££££").is_ok());
    }

    // ---- Conversation flow ----

    #[test]
    fn test_cheap_coke_or_pepsi_then_from_subway() {
        let orch = orchestrator();

        let first = orch.handle_turn("show me cheap Coke or Pepsi").unwrap();
        assert_eq!(first.filters_used.keywords, vec!["Coke", "Pepsi"]);
        assert_eq!(first.filters_used.sort_by, Some(SortKey::PriceAsc));
        assert!(first.filters_used.vendors.is_empty());
        let ids: Vec<&str> = first.products.iter().map(|r| r.product.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert_eq!(first.products[0].reason, "cheapest option");
        assert_eq!(
            first.message,
            "Context: Looking for: Coke, Pepsi | Budget: cheap\n\nFound 3 products matching your search"
        );

        let second = orch.handle_turn("from Subway").unwrap();
        assert_eq!(second.filters_used.vendors, vec!["Subway"]);
        assert_eq!(second.filters_used.keywords, vec!["Coke", "Pepsi"]);
        assert_eq!(second.filters_used.sort_by, Some(SortKey::PriceAsc));
        let ids: Vec<&str> = second.products.iter().map(|r| r.product.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4"]);
    }

    #[test]
    fn test_exclusion_replaces_inclusion() {
        let orch = orchestrator();
        orch.handle_turn("drinks from ASDA or Subway").unwrap();
        let resp = orch.handle_turn("not from ASDA").unwrap();
        assert!(resp.filters_used.vendors.is_empty());
        assert_eq!(resp.filters_used.exclude_vendors, vec!["ASDA"]);
        assert!(resp.products.iter().all(|r| r.product.vendor != "ASDA"));
    }

    #[test]
    fn test_any_shop_keeps_keywords() {
        let orch = orchestrator();
        orch.handle_turn("Pepsi from Subway").unwrap();
        let resp = orch.handle_turn("any shop").unwrap();
        assert!(resp.filters_used.vendors.is_empty());
        assert_eq!(resp.filters_used.keywords, vec!["Pepsi"]);
        assert_eq!(resp.products.len(), 2);
    }

    #[test]
    fn test_new_category_drops_keywords() {
        let orch = orchestrator();
        orch.handle_turn("vegan Coke").unwrap();
        let resp = orch.handle_turn("show me sandwiches").unwrap();
        assert_eq!(resp.filters_used.product_types, vec!["sandwich"]);
        assert!(resp.filters_used.tags.is_empty());
        assert!(resp.filters_used.keywords.is_empty());
        assert_eq!(resp.products.len(), 2);
    }

    #[test]
    fn test_food_items_expand() {
        let orch = orchestrator();
        let resp = orch.handle_turn("what food items do you have").unwrap();
        assert_eq!(
            resp.filters_used.product_types,
            vec!["sandwich", "bagel", "snack", "salad"]
        );
        assert_eq!(resp.products.len(), 3);
    }

    #[test]
    fn test_no_results_message() {
        let orch = orchestrator();
        let resp = orch.handle_turn("vegan bagels").unwrap();
        assert!(resp.products.is_empty());
        assert_eq!(resp.message, NO_RESULTS_MESSAGE);
        assert_eq!(resp.filters_used.tags, vec!["vegan"]);
    }

    #[test]
    fn test_unrecognized_text_returns_nothing() {
        let orch = orchestrator();
        let resp = orch.handle_turn("hello there").unwrap();
        assert!(resp.products.is_empty());
        assert!(resp.filters_used.is_empty());
    }

    #[test]
    fn test_result_limit_respected() {
        let orch = orchestrator_with(ChatConfig {
            result_limit: 2,
            ..ChatConfig::default()
        });
        let resp = orch.handle_turn("drinks").unwrap();
        assert_eq!(resp.products.len(), 2);
    }

    // ---- Reset ----

    #[test]
    fn test_reset_keyword_clears_context() {
        let orch = orchestrator();
        orch.handle_turn("cheap drinks from ASDA").unwrap();
        assert!(!orch.context().unwrap().is_empty());

        let resp = orch.handle_turn("  Start Over ").unwrap();
        assert_eq!(resp.message, RESET_MESSAGE);
        assert!(resp.products.is_empty());
        assert!(orch.context().unwrap().is_empty());
        assert!(orch.history().unwrap().is_empty());
    }

    #[test]
    fn test_consecutive_resets_are_identical() {
        let orch = orchestrator();
        orch.handle_turn("Pepsi from Subway").unwrap();
        let first = orch.handle_turn("reset").unwrap();
        let state_after_first = orch.context().unwrap();
        let second = orch.handle_turn("reset").unwrap();
        let state_after_second = orch.context().unwrap();
        assert_eq!(first, second);
        assert_eq!(state_after_first, state_after_second);
        assert!(state_after_second.is_empty());
    }

    #[test]
    fn test_reset_keyword_must_be_whole_message() {
        let orch = orchestrator();
        let resp = orch.handle_turn("clear drinks").unwrap();
        assert_ne!(resp.message, RESET_MESSAGE);
    }

    #[test]
    fn test_reset_session() {
        let orch = orchestrator();
        orch.handle_turn("drinks").unwrap();
        orch.reset_session().unwrap();
        assert!(orch.context().unwrap().is_empty());
        assert!(orch.history().unwrap().is_empty());
        assert_eq!(orch.context_summary().unwrap(), "");
    }

    // ---- History ----

    #[test]
    fn test_history_records_both_sides() {
        let orch = orchestrator();
        let resp = orch.handle_turn("drinks").unwrap();
        let history = orch.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "drinks");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, resp.message);
    }

    #[test]
    fn test_history_capped_at_max_history() {
        let orch = orchestrator_with(ChatConfig {
            max_history: 5,
            ..ChatConfig::default()
        });
        for text in ["drinks", "from ASDA", "cheap", "bagels"] {
            orch.handle_turn(text).unwrap();
        }
        let history = orch.history().unwrap();
        assert_eq!(history.len(), 5);
        // Oldest entries go first; the last turn is intact.
        assert_eq!(history[0].role, MessageRole::Assistant);
        assert_eq!(history[3].content, "bagels");
        assert_eq!(history[4].role, MessageRole::Assistant);
    }

    #[test]
    fn test_history_stays_bounded_over_many_turns() {
        let orch = orchestrator();
        for _ in 0..500 {
            orch.handle_turn("drinks").unwrap();
        }
        assert_eq!(orch.history().unwrap().len(), ChatConfig::default().max_history);
    }

    // ---- Oracle failure ----

    #[test]
    fn test_oracle_failure_keeps_context_and_apologizes_when_empty() {
        let orch =
            SessionOrchestrator::new(ChatConfig::default(), catalog(), Arc::new(FailingOracle));
        assert!(!orch.oracle_configured());
        assert_eq!(orch.oracle_name(), "failing");

        let resp = orch.handle_turn("cheap Pepsi please").unwrap();
        assert!(resp.products.is_empty());
        assert_eq!(resp.message, MISUNDERSTOOD_MESSAGE);
        assert!(resp.filters_used.is_empty());
    }

    #[test]
    fn test_poisoned_lock_yields_apology() {
        let orch = Arc::new(orchestrator());
        let clone = Arc::clone(&orch);
        let _ = std::thread::spawn(move || {
            let _guard = clone.session.lock().unwrap();
            panic!("poison the session lock");
        })
        .join();

        let resp = orch.handle_turn("drinks").unwrap();
        assert_eq!(resp.message, APOLOGY_MESSAGE);
        assert!(resp.products.is_empty());
        assert!(matches!(orch.history(), Err(ChatError::StateError(_))));
    }

    #[test]
    fn test_reset_session_recovers_poisoned_lock() {
        let orch = Arc::new(orchestrator());
        orch.handle_turn("drinks from ASDA").unwrap();
        let clone = Arc::clone(&orch);
        let _ = std::thread::spawn(move || {
            let _guard = clone.session.lock().unwrap();
            panic!("poison the session lock");
        })
        .join();
        assert_eq!(orch.handle_turn("drinks").unwrap().message, APOLOGY_MESSAGE);

        orch.reset_session().unwrap();
        assert!(orch.context().unwrap().is_empty());
        assert!(orch.history().unwrap().is_empty());
        let resp = orch.handle_turn("drinks").unwrap();
        assert_eq!(resp.products.len(), 3);
        assert_eq!(orch.history().unwrap().len(), 2);
    }

    // ---- Concurrency ----

    #[test]
    fn test_concurrent_turns_are_serialized() {
        let orch = Arc::new(orchestrator());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let orch = Arc::clone(&orch);
                std::thread::spawn(move || {
                    let text = if i % 2 == 0 { "drinks" } else { "from ASDA" };
                    orch.handle_turn(text).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(orch.history().unwrap().len(), 16);
        let ctx = orch.context().unwrap();
        assert!(ctx.vendors.is_empty() || ctx.exclude_vendors.is_empty());
    }

    #[test]
    fn test_catalog_accessor() {
        let orch = orchestrator();
        assert_eq!(orch.catalog().len(), 7);
        assert_eq!(orch.oracle_name(), "rules");
    }
}
