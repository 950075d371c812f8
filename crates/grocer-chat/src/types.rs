//! Chat-layer types: oracle suggestions, transcript entries, turn responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use grocer_core::types::{
    dedup_terms, Price, PriceFilter, PriceOperator, RankedResult, SortKey, StructuredQuery,
};

use crate::error::ChatError;

// =============================================================================
// FieldUpdate
// =============================================================================

/// Whether a suggestion mentions a field at all.
///
/// `Replace` with an empty list or `None` is an explicit clear, which is not
/// the same thing as `Inherit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Inherit,
    Replace(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Inherit
    }
}

impl<T> FieldUpdate<T> {
    pub fn is_inherit(&self) -> bool {
        matches!(self, FieldUpdate::Inherit)
    }

    /// The replacement value, or `prior` when the field was not mentioned.
    pub fn apply(self, prior: T) -> T {
        match self {
            FieldUpdate::Inherit => prior,
            FieldUpdate::Replace(value) => value,
        }
    }

    pub fn as_replace(&self) -> Option<&T> {
        match self {
            FieldUpdate::Inherit => None,
            FieldUpdate::Replace(value) => Some(value),
        }
    }
}

impl FieldUpdate<Vec<String>> {
    /// True when the field is explicitly set to a non-empty list.
    pub fn sets_non_empty(&self) -> bool {
        matches!(self, FieldUpdate::Replace(v) if !v.is_empty())
    }
}

// =============================================================================
// QuerySuggestion
// =============================================================================

/// A partial structured query proposed by an inference oracle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySuggestion {
    pub vendors: FieldUpdate<Vec<String>>,
    pub exclude_vendors: FieldUpdate<Vec<String>>,
    pub product_types: FieldUpdate<Vec<String>>,
    pub brand: FieldUpdate<Option<String>>,
    pub tags: FieldUpdate<Vec<String>>,
    pub price_filter: FieldUpdate<Option<PriceFilter>>,
    pub sort_by: FieldUpdate<Option<SortKey>>,
    pub keywords: FieldUpdate<Vec<String>>,
    /// The utterance asked to drop every vendor constraint.
    pub vendor_reset: bool,
}

impl QuerySuggestion {
    /// True when no field is mentioned and no reset was signalled.
    pub fn is_empty(&self) -> bool {
        self.vendors.is_inherit()
            && self.exclude_vendors.is_inherit()
            && self.product_types.is_inherit()
            && self.brand.is_inherit()
            && self.tags.is_inherit()
            && self.price_filter.is_inherit()
            && self.sort_by.is_inherit()
            && self.keywords.is_inherit()
            && !self.vendor_reset
    }

    /// Interpret a JSON object produced by a language model.
    ///
    /// A missing key means inherit, `null` means clear, anything else
    /// replaces. Unrecognized operators and sort keys are treated as absent.
    pub fn from_json(value: &Value) -> Result<Self, ChatError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ChatError::Oracle("suggestion is not a JSON object".to_string()))?;

        let list = |key: &str| match obj.get(key) {
            None => FieldUpdate::Inherit,
            Some(v) => FieldUpdate::Replace(json_string_list(v)),
        };

        let brand = match obj.get("brand") {
            None => FieldUpdate::Inherit,
            Some(Value::String(s)) if !s.trim().is_empty() => {
                FieldUpdate::Replace(Some(s.trim().to_string()))
            }
            Some(Value::String(_)) | Some(Value::Null) => FieldUpdate::Replace(None),
            Some(_) => FieldUpdate::Inherit,
        };

        let price_filter = match obj.get("price_filter") {
            None => FieldUpdate::Inherit,
            Some(Value::Null) => FieldUpdate::Replace(None),
            Some(v) => match json_price_filter(v) {
                Some(pf) => FieldUpdate::Replace(Some(pf)),
                None => FieldUpdate::Inherit,
            },
        };

        let sort_by = match obj.get("sort_by") {
            None => FieldUpdate::Inherit,
            Some(Value::Null) => FieldUpdate::Replace(None),
            Some(Value::String(s)) => match SortKey::parse(s) {
                Some(key) => FieldUpdate::Replace(Some(key)),
                None => FieldUpdate::Inherit,
            },
            Some(_) => FieldUpdate::Inherit,
        };

        let vendor_reset = obj
            .get("vendor_reset")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Self {
            vendors: list("vendors"),
            exclude_vendors: list("exclude_vendors"),
            product_types: list("product_types"),
            brand,
            tags: list("tags"),
            price_filter,
            sort_by,
            keywords: list("keywords"),
            vendor_reset,
        })
    }
}

/// A JSON string or array of strings; anything else is an empty list.
fn json_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => dedup_terms([s.as_str()]),
        Value::Array(items) => dedup_terms(items.iter().filter_map(Value::as_str)),
        _ => Vec::new(),
    }
}

fn json_price_filter(value: &Value) -> Option<PriceFilter> {
    let operator = PriceOperator::parse(value.get("operator")?.as_str()?)?;
    let amount = match value.get("value")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_start_matches('£').parse::<f64>().ok()?,
        _ => return None,
    };
    Some(PriceFilter::new(operator, Price::from_pounds(amount)?))
}

// =============================================================================
// Transcript
// =============================================================================

/// Who sent a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry in the in-memory conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// TurnResponse
// =============================================================================

/// What one conversation turn returns to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub message: String,
    pub products: Vec<RankedResult>,
    pub filters_used: StructuredQuery,
}

// =============================================================================
// Tests
// =============================================================================
