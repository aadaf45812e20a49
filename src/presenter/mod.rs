//! Turns aggregate results into chart descriptions and console summaries.
//!
//! Drawing is left to a [`sink::ChartSink`]; this module stops at a fully
//! specified [`chart::ChartSpec`].

use std::fmt::Write;

use crate::processor::{ProcessorError, Value, aggregator::GroupedResult, table::Table};

pub mod chart;
pub mod sink;

pub use chart::{AxisConfig, ChartKind, ChartSeries, ChartSpec, present};
pub use sink::{ChartSink, JsonFileSink, MemorySink};

/// An aggregate result together with the fields a chart reads from it
#[derive(Debug, Clone, Copy)]
pub enum AggregateView<'a> {
    /// Ranked records: `label` names the category (or x) column, `value` the value column
    Ranked {
        table: &'a Table,
        label: &'a str,
        value: &'a str,
    },
    /// Grouped measures. `x` of `None` means the group key.
    Grouped {
        result: &'a GroupedResult,
        x: Option<&'a str>,
        y: &'a str,
        size: Option<&'a str>,
    },
    Scalar { label: &'a str, value: f64 },
}

/// Human-readable text for a result. Informational only.
pub fn summarize(view: &AggregateView<'_>) -> Result<String, ProcessorError> {
    match view {
        AggregateView::Ranked {
            table,
            label,
            value,
        } => {
            if table.is_empty() {
                return Ok(format!("{} by {}: no data\n", label, value));
            }
            table.head(table.row_count(), &[*label, *value])
        }
        AggregateView::Grouped { result, .. } => Ok(grouped_text(result)),
        AggregateView::Scalar { label, value } if value.is_nan() => {
            Ok(format!("{}: undefined (fewer than 2 valid pairs)\n", label))
        }
        AggregateView::Scalar { label, value } => Ok(format!("{}: {:.3}\n", label, value)),
    }
}

fn grouped_text(result: &GroupedResult) -> String {
    if result.is_empty() {
        return format!("{}: no groups\n", result.key_column);
    }

    let keys: Vec<String> = result.groups.iter().map(|g| key_text(&g.key)).collect();
    let key_width = keys
        .iter()
        .map(|k| k.chars().count())
        .chain(std::iter::once(result.key_column.len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = write!(out, "{:<w$}", result.key_column, w = key_width);
    for m in &result.measures {
        let _ = write!(out, "  {:>14}", m);
    }
    out.push('\n');

    for (key, group) in keys.iter().zip(&result.groups) {
        let _ = write!(out, "{:<w$}", key, w = key_width);
        for v in &group.values {
            let _ = write!(out, "  {:>14}", v.to_string());
        }
        out.push('\n');
    }
    out
}

fn key_text(key: &Value) -> String {
    match key {
        Value::Float(v) => format!("{:.2}", v),
        other => other.to_string(),
    }
}
