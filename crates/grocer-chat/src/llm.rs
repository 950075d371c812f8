//! Language-model oracle over an OpenAI-compatible chat-completions API.
//!
//! The model is asked for a JSON object holding only the fields the new
//! message mentions. Merging with the prior context is left to the resolver.

use serde_json::{json, Value};
use tracing::{debug, warn};

use grocer_core::config::OracleConfig;
use grocer_core::types::StructuredQuery;

use crate::error::ChatError;
use crate::oracle::QueryOracle;
use crate::types::QuerySuggestion;

const SYSTEM_PROMPT: &str = r#"You translate grocery shopping requests into JSON filters.

Return ONE JSON object and nothing else. Include ONLY the keys the new user
message talks about. Leave a key out to keep its previous value. Use null or
[] to clear a key the user explicitly drops.

Keys:
- "vendors": list of shop names to include, e.g. ["ASDA", "Subway"]
- "exclude_vendors": list of shop names to exclude
- "product_types": list of categories, e.g. ["sandwich", "drink", "bagel", "snack", "salad"]
- "brand": brand name string
- "tags": list of dietary tags, e.g. ["vegan", "gluten-free", "low-calorie"]
- "price_filter": {"operator": "<" | "<=" | ">" | ">=" | "==", "value": number in GBP}
- "sort_by": "price_asc" | "price_desc" | "name"
- "keywords": list of product name words, e.g. ["Coke", "Pepsi"]
- "vendor_reset": true when the user asks for all / any shops

Rules:
- "from X" sets vendors; "not from X" or "except X" sets exclude_vendors.
- "cheap" or "cheapest" means sort_by price_asc; "expensive" means price_desc.
- Generic phrases such as "food items" or "drinks" go into product_types as written.
- Never repeat filters from the previous context unless the user restates them.

Examples:
User: "show me cheap Coke or Pepsi" -> {"keywords": ["Coke", "Pepsi"], "sort_by": "price_asc"}
User: "from Subway" -> {"vendors": ["Subway"]}
User: "not from ASDA" -> {"exclude_vendors": ["ASDA"]}
User: "any shop is fine" -> {"vendor_reset": true}
User: "under £3" -> {"price_filter": {"operator": "<", "value": 3}}"#;

/// Oracle backed by a hosted language model.
pub struct LlmOracle {
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: Option<String>,
}

impl LlmOracle {
    /// Build from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &OracleConfig) -> Self {
        Self::with_api_key(config, config.api_key())
    }

    pub fn with_api_key(config: &OracleConfig, api_key: Option<String>) -> Self {
        Self {
            endpoint: config.endpoint(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, user_text: &str, prior: &StructuredQuery) -> Value {
        let prior_json = serde_json::to_string(prior).unwrap_or_else(|_| "{}".to_string());
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": format!(
                        "[Previous context: {}]\n[User query: {}]",
                        prior_json, user_text
                    )
                }
            ],
        })
    }
}

impl QueryOracle for LlmOracle {
    fn suggest(
        &self,
        user_text: &str,
        prior: &StructuredQuery,
    ) -> Result<QuerySuggestion, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::Oracle("API key not configured".to_string()))?;

        // Built per call: a blocking client must not be dropped on an async worker.
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ChatError::Oracle(format!("client build failed: {}", e)))?;

        let response = client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(user_text, prior))
            .send()
            .map_err(|e| ChatError::Oracle(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, endpoint = %self.endpoint, "Oracle returned an error status");
            return Err(ChatError::Oracle(format!("HTTP {}", status)));
        }

        let body: Value = response
            .json()
            .map_err(|e| ChatError::Oracle(format!("invalid response body: {}", e)))?;
        let suggestion = parse_completion(&body)?;
        debug!(?suggestion, model = %self.model, "LLM oracle suggestion");
        Ok(suggestion)
    }

    fn name(&self) -> &str {
        "llm"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Extract the suggestion from a chat-completions response.
fn parse_completion(body: &Value) -> Result<QuerySuggestion, ChatError> {
    let content = body
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| ChatError::Oracle("response is missing message content".to_string()))?;

    let parsed: Value = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| ChatError::Oracle(format!("content is not valid JSON: {}", e)))?;
    QuerySuggestion::from_json(&parsed)
}

/// Models often wrap JSON in a ```json fence.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
