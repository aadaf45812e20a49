use std::fmt::Write;

use crate::processor::{ProcessorError, Value, column::Column};

/// Ordered rows over a fixed set of named, typed columns
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Builds a table, checking that every column has one cell per row.
    pub fn new(headers: Vec<String>, columns: Vec<Column>) -> Result<Self, ProcessorError> {
        if headers.len() != columns.len() {
            return Err(ProcessorError::Parse(format!(
                "Header/column mismatch: {} vs {}",
                headers.len(),
                columns.len()
            )));
        }

        let row_count = columns.first().map_or(0, Column::len);
        if let Some((i, col)) = columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != row_count)
        {
            return Err(ProcessorError::Parse(format!(
                "column '{}' has {} rows, expected {}",
                headers[i],
                col.len(),
                row_count
            )));
        }

        Ok(Table {
            headers,
            columns,
            row_count,
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn parts_mut(&mut self) -> (&[String], &mut [Column]) {
        (&self.headers, &mut self.columns)
    }

    pub fn column_index(&self, col_name: &str) -> Option<usize> {
        self.headers.iter().position(|cn| cn == col_name)
    }

    pub fn get_col(&self, col_name: &str) -> Result<&Column, ProcessorError> {
        self.column_index(col_name)
            .and_then(|i| self.columns.get(i))
            .ok_or_else(|| ProcessorError::MissingColumn(col_name.to_string()))
    }

    pub fn value(&self, row: usize, col_name: &str) -> Result<Value, ProcessorError> {
        Ok(self.get_col(col_name)?.value(row))
    }

    /// New table holding the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// Column overview in the spirit of a dataframe `info()` call.
    pub fn info(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} rows x {} columns",
            self.row_count,
            self.headers.len()
        );
        let width = self.headers.iter().map(String::len).max().unwrap_or(0);
        for (name, col) in self.headers.iter().zip(&self.columns) {
            let _ = writeln!(
                out,
                "  {:<width$}  {:>8} non-null  {}",
                name,
                self.row_count - col.null_count(),
                col.column_type().name(),
                width = width
            );
        }
        out
    }

    /// First `n` rows of the selected columns as a fixed-width text block.
    pub fn head(&self, n: usize, select: &[&str]) -> Result<String, ProcessorError> {
        let cols = select
            .iter()
            .map(|name| self.get_col(name))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = n.min(self.row_count);

        let cells: Vec<Vec<String>> = (0..rows)
            .map(|r| cols.iter().map(|c| c.value(r).to_string()).collect())
            .collect();
        let widths: Vec<usize> = select
            .iter()
            .enumerate()
            .map(|(i, h)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(h.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        for (h, w) in select.iter().zip(&widths) {
            let _ = write!(out, "{:<w$}  ", h, w = *w);
        }
        out.push('\n');
        for row in cells {
            for (cell, w) in row.iter().zip(&widths) {
                let _ = write!(out, "{:<w$}  ", cell, w = *w);
            }
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["title".into(), "year".into()],
            vec![
                Column::Str(vec![Some("A".into()), Some("B".into()), None]),
                Column::Int64(vec![Some(2000), None, Some(2002)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let res = Table::new(
            vec!["a".into(), "b".into()],
            vec![Column::Int64(vec![Some(1)]), Column::Int64(vec![])],
        );
        assert!(matches!(res, Err(ProcessorError::Parse(_))));
    }

    #[test]
    fn test_take_and_lookup() {
        let t = sample().take(&[2, 0]);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.value(0, "year").unwrap(), Value::Int(2002));
        assert_eq!(t.value(1, "title").unwrap(), Value::Str("A".into()));
        assert!(matches!(
            t.get_col("nope"),
            Err(ProcessorError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_info_counts_non_null() {
        let info = sample().info();
        assert!(info.starts_with("3 rows x 2 columns"));
        assert!(info.contains("2 non-null"));
    }

    #[test]
    fn test_head_limits_rows() {
        let head = sample().head(1, &["title"]).unwrap();
        assert_eq!(head.lines().count(), 2);
        assert!(head.contains('A'));
        assert!(!head.contains('B'));
    }
}
