//! Pure derived views over a cleaned [`Table`]: ranking, grouped reductions,
//! group filtering and correlation.

use std::collections::HashMap;

use tracing::debug;

use crate::helpers::simd_helpers::{dot_f64, sum_f64};
use crate::processor::{
    AggregateOp, AggregateResult, FilterPredicate, ProcessorError, Value, column::Column,
    table::Table,
};

/// One named reduction applied per group
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub column: String,
    pub op: AggregateOp,
    pub alias: Option<String>,
}

impl Reduction {
    pub fn new(column: &str, op: AggregateOp) -> Self {
        Self {
            column: column.to_string(),
            op,
            alias: None,
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Output measure name: the alias, or `<column>_<op>` in lowercase.
    pub fn name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| format!("{}_{:?}", self.column, self.op).to_lowercase())
    }
}

/// One output row of [`group_reduce`]
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Value,
    pub values: Vec<AggregateResult>,
}

/// Mapping from group key to reduced values, in first-appearance order
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedResult {
    pub key_column: String,
    pub measures: Vec<String>,
    pub groups: Vec<Group>,
}

impl GroupedResult {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn measure_index(&self, measure: &str) -> Result<usize, ProcessorError> {
        self.measures
            .iter()
            .position(|m| m == measure)
            .ok_or_else(|| ProcessorError::MissingMeasure(measure.to_string()))
    }

    pub fn get(&self, key: &Value, measure: &str) -> Option<AggregateResult> {
        let idx = self.measure_index(measure).ok()?;
        self.groups
            .iter()
            .find(|g| &g.key == key)
            .map(|g| g.values[idx])
    }

    /// All values of one measure, in group order.
    pub fn column(&self, measure: &str) -> Result<Vec<f64>, ProcessorError> {
        let idx = self.measure_index(measure)?;
        Ok(self.groups.iter().map(|g| g.values[idx].as_f64()).collect())
    }

    /// Sum of one measure across groups, ignoring NaN.
    pub fn total(&self, measure: &str) -> Result<f64, ProcessorError> {
        let values: Vec<f64> = self
            .column(measure)?
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect();
        Ok(sum_f64(&values))
    }

    /// Stable sort by one measure. NaN sorts last in either direction.
    pub fn sort_by_measure(mut self, measure: &str, ascending: bool) -> Result<Self, ProcessorError> {
        let idx = self.measure_index(measure)?;
        self.groups.sort_by(|a, b| {
            let (x, y) = (a.values[idx].as_f64(), b.values[idx].as_f64());
            match (x.is_nan(), y.is_nan()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                _ if ascending => x.total_cmp(&y),
                _ => y.total_cmp(&x),
            }
        });
        Ok(self)
    }

    /// Stable sort by group key; the null group stays last.
    pub fn sort_by_key(mut self, ascending: bool) -> Self {
        self.groups.sort_by(|a, b| match (a.key.is_null(), b.key.is_null()) {
            (false, false) if !ascending => b.key.sort_cmp(&a.key),
            _ => a.key.sort_cmp(&b.key),
        });
        self
    }

    pub fn head(mut self, n: usize) -> Self {
        self.groups.truncate(n);
        self
    }
}

/// Returns the first `n` records after a stable sort by `sort_key`
///
/// Descending unless `ascending`. Equal keys keep their input order and
/// nulls go last. `n` larger than the table yields the whole table sorted.
pub fn top_n(
    table: &Table,
    sort_key: &str,
    n: usize,
    ascending: bool,
) -> Result<Table, ProcessorError> {
    let col = table.get_col(sort_key)?;
    let mut rows: Vec<usize> = (0..table.row_count()).collect();

    rows.sort_by(|&a, &b| {
        let (x, y) = (col.value(a), col.value(b));
        match (x.is_null(), y.is_null()) {
            (false, false) if !ascending => y.sort_cmp(&x),
            _ => x.sort_cmp(&y),
        }
    });
    rows.truncate(n);

    Ok(table.take(&rows))
}

/// Group-by with one or more reductions
///
/// Records are partitioned by the value of `group_key`; a null key forms its
/// own group. Output rows follow the first appearance of each key.
///
/// # Example
/// ```rust
/// # use movie_insights::processor::{AggregateOp, aggregator::{group_reduce, Reduction}};
/// # fn demo(table: &movie_insights::processor::table::Table) {
/// let by_director = group_reduce(
///     table,
///     "Director",
///     &[Reduction::new("Gross", AggregateOp::Sum), Reduction::new("Gross", AggregateOp::Count)],
/// ).unwrap();
/// # }
/// ```
pub fn group_reduce(
    table: &Table,
    group_key: &str,
    reductions: &[Reduction],
) -> Result<GroupedResult, ProcessorError> {
    let gcol = table.get_col(group_key)?;
    let value_cols = reductions
        .iter()
        .map(|r| table.get_col(&r.column))
        .collect::<Result<Vec<_>, _>>()?;

    // Group data by key first
    let mut index: HashMap<Value, usize> = HashMap::new();
    let mut keys: Vec<Value> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();

    for row in 0..table.row_count() {
        let key = gcol.value(row);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            keys.push(key);
            members.push(Vec::new());
            keys.len() - 1
        });
        members[slot].push(row);
    }

    // Apply all reductions to each group
    let mut groups = Vec::with_capacity(keys.len());
    for (key, rows) in keys.into_iter().zip(&members) {
        let values = reductions
            .iter()
            .zip(&value_cols)
            .map(|(r, col)| aggregate_rows(col, &r.column, r.op, rows))
            .collect::<Result<Vec<_>, _>>()?;
        groups.push(Group { key, values });
    }

    debug!(group_key, groups = groups.len(), "grouped");

    Ok(GroupedResult {
        key_column: group_key.to_string(),
        measures: reductions.iter().map(Reduction::name).collect(),
        groups,
    })
}

/// Keeps the groups whose `measure` satisfies `predicate`, in order.
pub fn filter_groups(
    grouped: GroupedResult,
    measure: &str,
    predicate: &FilterPredicate,
) -> Result<GroupedResult, ProcessorError> {
    let idx = grouped.measure_index(measure)?;
    let before = grouped.len();
    let GroupedResult {
        key_column,
        measures,
        groups,
    } = grouped;

    let groups: Vec<Group> = groups
        .into_iter()
        .filter(|g| predicate.matches(g.values[idx].as_f64()))
        .collect();
    debug!(measure, before, after = groups.len(), "filtered groups");

    Ok(GroupedResult {
        key_column,
        measures,
        groups,
    })
}

/// Pearson correlation between two numeric columns
///
/// Only rows where both values are non-null take part. Fewer than two such
/// pairs, or a column with zero variance, gives `NaN`.
pub fn correlation(table: &Table, column_a: &str, column_b: &str) -> Result<f64, ProcessorError> {
    let a = numeric_col(table, column_a)?;
    let b = numeric_col(table, column_b)?;

    let (xs, ys): (Vec<f64>, Vec<f64>) = (0..table.row_count())
        .filter_map(|i| Some((a.get_f64(i)?, b.get_f64(i)?)))
        .unzip();

    Ok(pearson(&xs, &ys))
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return f64::NAN;
    }

    let mean_x = sum_f64(xs) / n as f64;
    let mean_y = sum_f64(ys) / n as f64;
    let dx: Vec<f64> = xs.iter().map(|x| x - mean_x).collect();
    let dy: Vec<f64> = ys.iter().map(|y| y - mean_y).collect();

    let denom = (dot_f64(&dx, &dx) * dot_f64(&dy, &dy)).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return f64::NAN;
    }
    (dot_f64(&dx, &dy) / denom).clamp(-1.0, 1.0)
}

fn numeric_col<'a>(table: &'a Table, name: &str) -> Result<&'a Column, ProcessorError> {
    let col = table.get_col(name)?;
    if !col.is_numeric() {
        return Err(ProcessorError::TypeMismatch {
            column: name.to_string(),
            expected: "numeric",
        });
    }
    Ok(col)
}

/// Helper to aggregate specific rows for a column
fn aggregate_rows(
    col: &Column,
    name: &str,
    op: AggregateOp,
    rows: &[usize],
) -> Result<AggregateResult, ProcessorError> {
    if op == AggregateOp::Count {
        let n = rows.iter().filter(|&&i| !col.is_null(i)).count();
        return Ok(AggregateResult::Int(n as i64));
    }

    match col {
        Column::Int64(values) => {
            let present: Vec<i64> = rows.iter().filter_map(|&i| values[i]).collect();
            Ok(match op {
                // widen to float rather than wrap
                AggregateOp::Sum => present
                    .iter()
                    .try_fold(0i64, |acc, &v| acc.checked_add(v))
                    .map_or_else(
                        || AggregateResult::Float(present.iter().map(|&v| v as f64).sum()),
                        AggregateResult::Int,
                    ),
                AggregateOp::Mean if present.is_empty() => AggregateResult::Float(f64::NAN),
                AggregateOp::Mean => AggregateResult::Float(
                    present.iter().map(|&v| v as f64).sum::<f64>() / present.len() as f64,
                ),
                AggregateOp::Min => present
                    .iter()
                    .min()
                    .map_or(AggregateResult::Float(f64::NAN), |&v| AggregateResult::Int(v)),
                AggregateOp::Max => present
                    .iter()
                    .max()
                    .map_or(AggregateResult::Float(f64::NAN), |&v| AggregateResult::Int(v)),
                AggregateOp::Count => unreachable!(),
            })
        }

        Column::Float64(_) => {
            let present = col.collect_f64(rows);
            let n = present.len();
            Ok(AggregateResult::Float(match op {
                AggregateOp::Sum => sum_f64(&present),
                AggregateOp::Mean if n == 0 => f64::NAN,
                AggregateOp::Mean => sum_f64(&present) / n as f64,
                AggregateOp::Min => present.iter().copied().reduce(f64::min).unwrap_or(f64::NAN),
                AggregateOp::Max => present.iter().copied().reduce(f64::max).unwrap_or(f64::NAN),
                AggregateOp::Count => unreachable!(),
            }))
        }

        Column::Str(_) => Err(ProcessorError::TypeMismatch {
            column: name.to_string(),
            expected: "numeric",
        }),
    }
}
