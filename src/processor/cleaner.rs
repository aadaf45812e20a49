use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::processor::{column::Column, table::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    /// Text with grouping characters, parsed as float
    FormattedNumeric,
    Numeric,
    Year,
}

/// Normalises the configured columns and drops records that are null in any
/// required column.
///
/// Coercion never fails: a cell that cannot be parsed becomes null. The
/// surviving records keep their input order, and an empty result is a valid
/// (empty) table.
///
/// Every `required` column is expected to exist in `table`; the loader
/// checks this against [`AnalysisConfig::referenced_columns`]. A required
/// column that is absent is logged and filters nothing.
pub fn clean(mut table: Table, config: &AnalysisConfig) -> Table {
    let rules: Vec<(&str, Coercion)> = config
        .formatted_numeric
        .iter()
        .map(|c| (c.as_str(), Coercion::FormattedNumeric))
        .chain(config.numeric.iter().map(|c| (c.as_str(), Coercion::Numeric)))
        .chain(config.year.iter().map(|c| (c.as_str(), Coercion::Year)))
        .collect();
    let grouping: Vec<char> = config.grouping_chars.chars().collect();

    {
        let (headers, columns) = table.parts_mut();
        columns
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, col)| {
                // first matching rule wins
                if let Some((name, rule)) = rules.iter().find(|(name, _)| *name == headers[idx]) {
                    let before = col.null_count();
                    *col = coerce(col, *rule, &grouping);
                    debug!(
                        column = %name,
                        rule = ?rule,
                        new_nulls = col.null_count().saturating_sub(before),
                        "coerced column"
                    );
                }
            });
    }

    let required: Vec<&Column> = config
        .required
        .iter()
        .filter_map(|name| match table.get_col(name) {
            Ok(col) => Some(col),
            Err(_) => {
                warn!(column = %name, "required column not in table; not filtering on it");
                None
            }
        })
        .collect();
    let keep: Vec<usize> = (0..table.row_count())
        .filter(|&row| required.iter().all(|col| !col.is_null(row)))
        .collect();

    let dropped = table.row_count() - keep.len();
    info!(kept = keep.len(), dropped, "cleaning complete");

    if dropped == 0 {
        table
    } else {
        table.take(&keep)
    }
}

fn coerce(col: &Column, rule: Coercion, grouping: &[char]) -> Column {
    match rule {
        Coercion::FormattedNumeric | Coercion::Numeric => {
            let strip: &[char] = if rule == Coercion::FormattedNumeric {
                grouping
            } else {
                &[]
            };
            Column::Float64(
                (0..col.len())
                    .map(|i| match col {
                        Column::Str(v) => v[i].as_deref().and_then(|s| parse_float(s, strip)),
                        _ => col.get_f64(i),
                    })
                    .collect(),
            )
        }
        Coercion::Year => Column::Int64(
            (0..col.len())
                .map(|i| match col {
                    Column::Int64(v) => v[i],
                    Column::Float64(v) => v[i].and_then(integral),
                    Column::Str(v) => v[i].as_deref().and_then(parse_year),
                })
                .collect(),
        ),
    }
}

/// Parse-or-null for numeric text. NaN counts as null.
pub fn parse_float(raw: &str, strip: &[char]) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !strip.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    fast_float::parse::<f64, _>(cleaned)
        .ok()
        .filter(|v| !v.is_nan())
}

/// Parse-or-null for years; accepts `1994` and `1994.0`.
pub fn parse_year(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    atoi_simd::parse::<i64>(raw.as_bytes())
        .ok()
        .or_else(|| fast_float::parse::<f64, _>(raw).ok().and_then(integral))
}

fn integral(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}
