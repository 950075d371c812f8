use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

// =============================================================================
// Price
// =============================================================================

/// A non-negative amount of money in GBP, stored as whole pence.
///
/// Integer storage makes `==` comparisons exact. Serialized as a JSON number
/// in pounds (`2.5`), displayed as `£2.50`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

/// Largest fractional-penny error accepted when converting from pounds.
const PENCE_EPSILON: f64 = 1e-6;

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_pence(pence: u64) -> Self {
        Self(pence)
    }

    /// Convert a pound amount to a price.
    ///
    /// Returns `None` for negative, NaN or infinite input, and for amounts
    /// that are not a whole number of pence (`2.996`). Float noise up to a
    /// millionth of a penny is tolerated, so `0.1 + 0.2` is 30p.
    pub fn from_pounds(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let exact = value * 100.0;
        let pence = exact.round();
        if (exact - pence).abs() > PENCE_EPSILON || pence > u64::MAX as f64 {
            return None;
        }
        Some(Self(pence as u64))
    }

    pub fn pence(&self) -> u64 {
        self.0
    }

    pub fn as_pounds(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_pounds())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Price::from_pounds(value)
            .ok_or_else(|| de::Error::custom(format!("invalid price: {}", value)))
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Comparison operator for a price bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceOperator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
}

impl PriceOperator {
    /// Parse an operator token. Unknown tokens yield `None` rather than an error.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "<" => Some(Self::Lt),
            "<=" | "≤" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" | "≥" => Some(Self::Ge),
            "==" | "=" => Some(Self::Eq),
            _ => None,
        }
    }

    /// The canonical wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
        }
    }

    /// The symbol used in human-readable text.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "≤",
            Self::Gt => ">",
            Self::Ge => "≥",
            Self::Eq => "=",
        }
    }

    /// Whether `lhs <op> rhs` holds.
    pub fn holds(&self, lhs: Price, rhs: Price) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
        }
    }
}

/// Result ordering requested by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    Name,
}

impl SortKey {
    /// Parse a sort key. Unknown keys yield `None` rather than an error.
    pub fn parse(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "price_asc" => Some(Self::PriceAsc),
            "price_desc" => Some(Self::PriceDesc),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Name => "name",
        }
    }
}

// =============================================================================
// Query model
// =============================================================================

/// A price bound: `record.price <operator> value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceFilter {
    pub operator: PriceOperator,
    pub value: Price,
}

impl PriceFilter {
    pub fn new(operator: PriceOperator, value: Price) -> Self {
        Self { operator, value }
    }

    pub fn matches(&self, price: Price) -> bool {
        self.operator.holds(price, self.value)
    }

    /// Human-readable bound, e.g. `price ≤ £3.00`.
    pub fn describe(&self) -> String {
        format!("price {} {}", self.operator.symbol(), self.value)
    }
}

/// The negotiated filter state carried across conversation turns.
///
/// List-valued fields behave as sets: entries are unique (case-insensitive)
/// and their order only matters for display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredQuery {
    pub vendors: Vec<String>,
    pub exclude_vendors: Vec<String>,
    pub product_types: Vec<String>,
    pub brand: Option<String>,
    pub tags: Vec<String>,
    pub price_filter: Option<PriceFilter>,
    pub sort_by: Option<SortKey>,
    pub keywords: Vec<String>,
}

impl StructuredQuery {
    /// True when every field is empty or unset.
    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
            && self.exclude_vendors.is_empty()
            && self.product_types.is_empty()
            && self.brand.is_none()
            && self.tags.is_empty()
            && self.price_filter.is_none()
            && self.sort_by.is_none()
            && self.keywords.is_empty()
    }

    /// De-duplicate every list field and drop blank entries and blank brands.
    pub fn normalized(mut self) -> Self {
        self.vendors = dedup_terms(self.vendors);
        self.exclude_vendors = dedup_terms(self.exclude_vendors);
        self.product_types = dedup_terms(self.product_types);
        self.tags = dedup_terms(self.tags);
        self.keywords = dedup_terms(self.keywords);
        self.brand = self
            .brand
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        self
    }
}

/// Trim, drop empties, and remove case-insensitive duplicates, keeping the
/// first occurrence in its original position.
pub fn dedup_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for term in terms {
        let trimmed = term.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.iter().any(|t| t.eq_ignore_ascii_case(trimmed)) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Order-insensitive, case-insensitive equality of two term sets.
pub fn same_terms(a: &[String], b: &[String]) -> bool {
    let norm = |terms: &[String]| {
        let mut v: Vec<String> = dedup_terms(terms)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect();
        v.sort();
        v
    };
    norm(a) == norm(b)
}

// =============================================================================
// Catalog records
// =============================================================================

/// A product loaded from the static catalog. Immutable after load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub brand: String,
    pub price: Price,
    pub vendor: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProductRecord {
    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Case-insensitive name ordering, falling back to the raw name so the
    /// order is total.
    pub fn cmp_by_name(&self, other: &ProductRecord) -> Ordering {
        self.name
            .to_lowercase()
            .cmp(&other.name.to_lowercase())
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// A product that matched a query, annotated with why it was included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub reason: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    match Id::deserialize(deserializer)? {
        Id::Text(s) => Ok(s),
        Id::Int(n) => Ok(n.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================
