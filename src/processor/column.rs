use crate::processor::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Str,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Str => "string",
        }
    }
}

/// A typed column of nullable cells
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
}

impl Column {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
            Column::Str(_) => ColumnType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Column::Str(_))
    }

    pub fn is_null(&self, idx: usize) -> bool {
        match self {
            Column::Int64(v) => v[idx].is_none(),
            Column::Float64(v) => v[idx].is_none_or(|f| f.is_nan()),
            Column::Str(v) => v[idx].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    // Random access
    pub fn value(&self, idx: usize) -> Value {
        match self {
            Column::Int64(v) => v[idx].map_or(Value::Null, Value::Int),
            Column::Float64(v) => match v[idx] {
                Some(f) if !f.is_nan() => Value::Float(f),
                _ => Value::Null,
            },
            Column::Str(v) => v[idx].clone().map_or(Value::Null, Value::Str),
        }
    }

    /// Numeric view of a cell; `None` for nulls and string columns.
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        match self {
            Column::Int64(v) => v[idx].map(|i| i as f64),
            Column::Float64(v) => v[idx].filter(|f| !f.is_nan()),
            Column::Str(_) => None,
        }
    }

    /// Non-null numeric values at the given rows, in row order.
    pub fn collect_f64(&self, rows: &[usize]) -> Vec<f64> {
        rows.iter().filter_map(|&i| self.get_f64(i)).collect()
    }

    /// Builds a new column holding the given rows in the given order.
    pub fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Int64(v) => Column::Int64(rows.iter().map(|&i| v[i]).collect()),
            Column::Float64(v) => Column::Float64(rows.iter().map(|&i| v[i]).collect()),
            Column::Str(v) => Column::Str(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Raw text of a cell as it would have appeared in the source.
    pub fn text(&self, idx: usize) -> Option<String> {
        match self {
            Column::Str(v) => v[idx].clone(),
            _ => match self.value(idx) {
                Value::Null => None,
                other => Some(other.to_string()),
            },
        }
    }
}
