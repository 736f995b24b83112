//! Filter expressions.
//!
//! A filter is written as three whitespace-separated tokens,
//! `field operator value`, e.g. `"status == completed"` or `"age >= 21"`.
//! The split is purely positional, so a value containing whitespace cannot be
//! expressed in this form.
//!
//! The value token becomes a number when it reads as a finite, non-zero
//! numeric literal; anything else (including `"0"`) stays a string.

use crate::error::FilterParseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Largest integer a float represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "array-contains")]
    ArrayContains,
    #[serde(rename = "array-contains-any")]
    ArrayContainsAny,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not-in")]
    NotIn,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Ge => ">=",
            FilterOp::Gt => ">",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::ArrayContainsAny => "array-contains-any",
            FilterOp::In => "in",
            FilterOp::NotIn => "not-in",
        }
    }

    /// Whether a three-way comparison result satisfies this operator.
    ///
    /// Membership operators have no ordering semantics and return `None`.
    pub fn accepts(&self, ordering: Ordering) -> Option<bool> {
        match self {
            FilterOp::Lt => Some(ordering == Ordering::Less),
            FilterOp::Le => Some(ordering != Ordering::Greater),
            FilterOp::Eq => Some(ordering == Ordering::Equal),
            FilterOp::Ne => Some(ordering != Ordering::Equal),
            FilterOp::Ge => Some(ordering != Ordering::Less),
            FilterOp::Gt => Some(ordering == Ordering::Greater),
            _ => None,
        }
    }
}

impl FromStr for FilterOp {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Le,
            "==" => FilterOp::Eq,
            "!=" => FilterOp::Ne,
            ">=" => FilterOp::Ge,
            ">" => FilterOp::Gt,
            "array-contains" => FilterOp::ArrayContains,
            "array-contains-any" => FilterOp::ArrayContainsAny,
            "in" => FilterOp::In,
            "not-in" => FilterOp::NotIn,
            other => return Err(FilterParseError::UnknownOperator(other.to_string())),
        })
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The right-hand side of a filter after coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    /// Coerces a raw value token.
    pub fn coerce(token: &str) -> Self {
        match parse_number(token) {
            Some(n) if n.is_finite() && n != 0.0 => {
                if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
                    FilterValue::Integer(n as i64)
                } else {
                    FilterValue::Float(n)
                }
            }
            _ => FilterValue::Text(token.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Integer(i) => Some(*i as f64),
            FilterValue::Float(f) => Some(*f),
            FilterValue::Text(_) => None,
        }
    }

    /// JSON form of the value.
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Integer(i) => Value::from(*i),
            FilterValue::Float(f) => Value::from(*f),
            FilterValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Orders a stored JSON value against this filter value.
    ///
    /// Numbers compare numerically and strings lexicographically; any other
    /// pairing is incomparable.
    pub fn compare(&self, stored: &Value) -> Option<Ordering> {
        match (self, stored) {
            (FilterValue::Text(s), Value::String(v)) => Some(v.as_str().cmp(s.as_str())),
            (FilterValue::Text(_), _) => None,
            (number, Value::Number(v)) => v.as_f64()?.partial_cmp(&number.as_f64()?),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Integer(i) => write!(f, "{i}"),
            FilterValue::Float(v) => write!(f, "{v}"),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

/// Numeric literal forms accepted for coercion: decimal (with optional sign,
/// fraction and exponent) and unsigned `0x`/`0o`/`0b` integers.
fn parse_number(token: &str) -> Option<f64> {
    let radix = match token.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&token[2..], radix).ok().map(|n| n as f64);
    }

    // Rust also accepts "inf"/"nan" spellings; those never coerce.
    if !token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    token.parse::<f64>().ok()
}

/// A structured `field operator value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterPredicate {
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Parses a single filter expression.
    pub fn parse(expression: &str) -> Result<Self, FilterParseError> {
        let tokens: Vec<&str> = expression.split_whitespace().collect();
        let [field, op, value] = tokens.as_slice() else {
            return Err(FilterParseError::TokenCount {
                expression: expression.to_string(),
                found: tokens.len(),
            });
        };

        Ok(Self {
            field: (*field).to_string(),
            op: op.parse()?,
            value: FilterValue::coerce(value),
        })
    }

    /// Evaluates the predicate against a stored field value.
    ///
    /// Returns `None` for operators whose right-hand side would need to be a
    /// list, which a textual filter cannot express.
    pub fn matches(&self, stored: Option<&Value>) -> Option<bool> {
        match self.op {
            FilterOp::ArrayContains => Some(match stored {
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|item| self.value.compare(item) == Some(Ordering::Equal)),
                _ => false,
            }),
            FilterOp::ArrayContainsAny | FilterOp::In | FilterOp::NotIn => None,
            op => Some(
                stored
                    .and_then(|v| self.value.compare(v))
                    .and_then(|ordering| op.accepts(ordering))
                    .unwrap_or(false),
            ),
        }
    }
}

impl FromStr for FilterPredicate {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.field, self.op, self.value)
    }
}

/// Parses every expression; the resulting predicates narrow the same
/// reference, so together they form a conjunction.
pub fn parse_all<I, S>(expressions: I) -> Result<Vec<FilterPredicate>, FilterParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    expressions
        .into_iter()
        .map(|e| FilterPredicate::parse(e.as_ref()))
        .collect()
}
