//! Conversational product search for the grocery assistant.
//!
//! Resolves free-text turns against the running filter context, searches the
//! catalog deterministically and assembles the reply for one conversation.

pub mod context;
pub mod engine;
pub mod error;
pub mod llm;
pub mod oracle;
pub mod orchestrator;
pub mod resolver;
pub mod response;
pub mod types;

pub use context::ContextState;
pub use engine::FilterEngine;
pub use error::ChatError;
pub use llm::LlmOracle;
pub use oracle::{QueryOracle, RuleOracle};
pub use orchestrator::SessionOrchestrator;
pub use resolver::{QueryResolver, Resolution};
pub use response::ResponseGenerator;
pub use types::{ChatMessage, FieldUpdate, MessageRole, QuerySuggestion, TurnResponse};
