use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::geo::GeoRadius;

/// Comparison keywords accepted in `field[op]=value` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    /// Whole-word keyword match; `gtx` or `inn` are not operators.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
        }
    }
}

/// A typed comparison. Values stay as the raw query-string text and are
/// interpreted by the store against the stored field's type.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Eq(String),
    Gt(String),
    Gte(String),
    Lt(String),
    Lte(String),
    In(Vec<String>),
    Within(GeoRadius),
}

impl Comparison {
    pub fn new(op: FilterOp, raw: &str) -> Self {
        match op {
            FilterOp::Eq => Comparison::Eq(raw.to_string()),
            FilterOp::Gt => Comparison::Gt(raw.to_string()),
            FilterOp::Gte => Comparison::Gte(raw.to_string()),
            FilterOp::Lt => Comparison::Lt(raw.to_string()),
            FilterOp::Lte => Comparison::Lte(raw.to_string()),
            FilterOp::In => Comparison::In(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub comparison: Comparison,
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self { field: field.into(), comparison: Comparison::Eq(value.into()) }
    }

    /// Evaluate against an in-memory document. Array fields match when any
    /// element matches; missing fields never match.
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        let Some(value) = field_value(doc, &self.field) else {
            return false;
        };

        if let Comparison::Within(radius) = &self.comparison {
            return radius.contains_point(value);
        }

        match value {
            Value::Array(items) => items.iter().any(|item| self.matches_scalar(item)),
            other => self.matches_scalar(other),
        }
    }

    fn matches_scalar(&self, value: &Value) -> bool {
        let cmp = |raw: &str| compare_raw(value, raw);
        match &self.comparison {
            Comparison::Eq(raw) => cmp(raw) == Some(Ordering::Equal),
            Comparison::Gt(raw) => cmp(raw) == Some(Ordering::Greater),
            Comparison::Gte(raw) => matches!(cmp(raw), Some(Ordering::Greater | Ordering::Equal)),
            Comparison::Lt(raw) => cmp(raw) == Some(Ordering::Less),
            Comparison::Lte(raw) => matches!(cmp(raw), Some(Ordering::Less | Ordering::Equal)),
            Comparison::In(raws) => raws.iter().any(|raw| cmp(raw) == Some(Ordering::Equal)),
            Comparison::Within(_) => false,
        }
    }
}

/// Compare a stored value against raw query text using the stored value's
/// type: numbers against numeric text, booleans against `true`/`false`,
/// strings bytewise against the text as given. Any other pairing has no
/// ordering and never matches. The SQL builder follows the same rule.
fn compare_raw(value: &Value, raw: &str) -> Option<Ordering> {
    match value {
        Value::Number(n) => n.as_f64()?.partial_cmp(&query_number(raw)?),
        Value::Bool(b) => query_bool(raw).map(|rhs| b.cmp(&rhs)),
        Value::String(s) => Some(s.as_bytes().cmp(raw.as_bytes())),
        _ => None,
    }
}

/// Numeric reading of a query value; `NaN` and infinities are text.
pub fn query_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn query_bool(raw: &str) -> Option<bool> {
    raw.trim().parse::<bool>().ok()
}

/// Resolve a dotted path (`location.state`) inside a document.
pub fn field_value<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

/// Page request; both values are always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn start_index(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    pub fn end_index(&self) -> u64 {
        self.page as u64 * self.limit as u64
    }
}

/// Link to a neighbouring page in a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u32,
    pub limit: u32,
}

/// Everything a list request asks for, built fresh per request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub filter: Vec<Condition>,
    pub select: Vec<String>,
    pub sort: Vec<SortField>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<String>,
}
