use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregator;
pub mod cleaner;
pub mod column;
pub mod loader;
pub mod table;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("required column missing from header: {0}")]
    SchemaMissing(String),

    #[error("source has no header line")]
    MissingHeader,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Missing measure: {0}")]
    MissingMeasure(String),

    #[error("column {column} is not {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("cannot chart {0}")]
    Unchartable(String),

    #[error("Schema/parse error: {0}")]
    Parse(String),
}

impl ProcessorError {
    /// Errors that halt a run before any output is produced.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            ProcessorError::SourceNotFound(_)
                | ProcessorError::SchemaMissing(_)
                | ProcessorError::MissingHeader
        )
    }
}

#[derive(Debug, Default)]
pub struct ParseSummary {
    pub rows_processed: usize,
    pub errors: Vec<ParseError>,
}

#[derive(Debug)]
pub struct ParseError {
    /// 1-based line number in the source, header included
    pub row: usize,
    pub error: String,
}

/// A single cell. `Null` is what coercion produces on failure.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Ordering used by ranking. Numbers compare numerically across int/float,
    /// strings lexically, and nulls sort after everything.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Str(_), _) => Ordering::Greater,
            (_, Value::Str(_)) => Ordering::Less,
            (a, b) => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                x.total_cmp(&y)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
            Value::Null => f.write_str("(null)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Null => {}
        }
    }
}

/// Predicate over a reduced group value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPredicate {
    Equals(f64),
    GreaterThan(f64),
    AtLeast(f64),
    LessThan(f64),
    AtMost(f64),
    Between(f64, f64),
}

impl FilterPredicate {
    pub fn matches(&self, v: f64) -> bool {
        match *self {
            FilterPredicate::Equals(t) => v == t,
            FilterPredicate::GreaterThan(t) => v > t,
            FilterPredicate::AtLeast(t) => v >= t,
            FilterPredicate::LessThan(t) => v < t,
            FilterPredicate::AtMost(t) => v <= t,
            FilterPredicate::Between(lo, hi) => v >= lo && v <= hi,
        }
    }
}

/// Aggregate operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    /// Sum of non-null values
    Sum,
    /// Mean of non-null values
    Mean,
    /// Number of non-null values
    Count,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
}

/// Result of an aggregation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateResult {
    Int(i64),
    Float(f64),
}

impl AggregateResult {
    pub fn as_f64(&self) -> f64 {
        match *self {
            AggregateResult::Int(v) => v as f64,
            AggregateResult::Float(v) => v,
        }
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateResult::Int(v) => write!(f, "{}", v),
            AggregateResult::Float(v) => write!(f, "{:.3}", v),
        }
    }
}
