use memchr::memchr3_iter;
use memmap2::Mmap;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::{fs::File, io::ErrorKind, path::Path};
use tracing::{debug, info, warn};

use crate::processor::{
    ParseError, ParseSummary, ProcessorError,
    column::{Column, ColumnType},
    table::Table,
};

/// Output of [`load_csv`]
#[derive(Debug)]
pub struct LoadedTable {
    pub table: Table,
    pub summary: ParseSummary,
}

/// Loads a CSV file into a [`Table`] using memory mapping
///
/// The first line is the header. Column types are inferred over every
/// non-empty cell (int, then float, else string); empty cells are null.
///
/// # Errors
/// - [`ProcessorError::SourceNotFound`] if the file does not exist
/// - [`ProcessorError::MissingHeader`] if the file is empty
/// - [`ProcessorError::SchemaMissing`] for the first `required` column absent
///   from the header
///
/// Rows whose field count differs from the header are skipped and reported
/// in the returned [`ParseSummary`].
pub fn load_csv(path: &Path, required: &[String]) -> Result<LoadedTable, ProcessorError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProcessorError::SourceNotFound(path.display().to_string()),
        _ => ProcessorError::Io(e),
    })?;
    let mmap = unsafe { Mmap::map(&file)? };
    let loaded = parse_csv(&mmap[..], required)?;

    info!(
        path = %path.display(),
        rows = loaded.table.row_count(),
        columns = loaded.table.headers().len(),
        skipped = loaded.summary.errors.len(),
        "loaded source"
    );
    Ok(loaded)
}

/// Parses CSV bytes already in memory. See [`load_csv`].
pub fn parse_csv(buf: &[u8], required: &[String]) -> Result<LoadedTable, ProcessorError> {
    let buf = buf.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(buf);
    let mut records = split_records(buf).into_iter();

    let (_, headers) = records.next().ok_or(ProcessorError::MissingHeader)?;
    let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();

    if let Some(missing) = required.iter().find(|r| !headers.contains(r)) {
        return Err(ProcessorError::SchemaMissing(missing.clone()));
    }

    let num_cols = headers.len();
    let mut errors = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for (line, fields) in records {
        if fields.len() != num_cols {
            warn!(line, expected = num_cols, got = fields.len(), "skipping row");
            errors.push(ParseError {
                row: line,
                error: format!("Expected {} fields, got {}", num_cols, fields.len()),
            });
            continue;
        }
        rows.push(fields);
    }

    let columns: Vec<Column> = (0..num_cols)
        .into_par_iter()
        .map(|col_idx| build_column(&rows, col_idx))
        .collect();

    for (name, col) in headers.iter().zip(&columns) {
        debug!(column = %name, kind = col.column_type().name(), "inferred column type");
    }

    let summary = ParseSummary {
        rows_processed: rows.len(),
        errors,
    };
    let table = Table::new(headers, columns)?;

    Ok(LoadedTable { table, summary })
}

fn infer_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut kind = ColumnType::Int64;
    for cell in cells.filter(|c| !c.is_empty()) {
        if kind == ColumnType::Int64 && atoi_simd::parse::<i64>(cell.as_bytes()).is_ok() {
            continue;
        }
        if fast_float::parse::<f64, _>(cell).is_ok() {
            kind = ColumnType::Float64;
            continue;
        }
        return ColumnType::Str;
    }
    kind
}

fn build_column(rows: &[Vec<String>], col_idx: usize) -> Column {
    let cells = || rows.iter().map(|r| r[col_idx].trim());

    match infer_type(cells()) {
        ColumnType::Int64 => Column::Int64(
            cells()
                .map(|c| atoi_simd::parse::<i64>(c.as_bytes()).ok())
                .collect(),
        ),
        ColumnType::Float64 => Column::Float64(
            cells()
                .map(|c| fast_float::parse::<f64, _>(c).ok())
                .collect(),
        ),
        ColumnType::Str => Column::Str(
            cells()
                .map(|c| (!c.is_empty()).then(|| c.to_string()))
                .collect(),
        ),
    }
}

/// Splits a buffer into records of unquoted fields.
///
/// A quote opens a quoted field only as the field's first non-blank byte;
/// anywhere else it is literal text. Quoted fields may contain commas,
/// newlines and doubled quotes. Each record carries the 1-based line number
/// it starts on. Blank lines are skipped.
fn split_records(buf: &[u8]) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field_start = 0;
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut escaped = None;

    for pos in memchr3_iter(b',', b'\n', b'"', buf) {
        if escaped == Some(pos) {
            continue;
        }
        match buf[pos] {
            b'"' if in_quotes => {
                if buf.get(pos + 1) == Some(&b'"') {
                    escaped = Some(pos + 1);
                } else {
                    in_quotes = false;
                }
            }
            b'"' => {
                in_quotes = buf[field_start..pos].iter().all(u8::is_ascii_whitespace);
            }
            b'\n' if in_quotes => line += 1,
            b',' if !in_quotes => {
                fields.push(unquote(&buf[field_start..pos]));
                field_start = pos + 1;
            }
            b'\n' => {
                fields.push(unquote(&buf[field_start..pos]));
                field_start = pos + 1;
                end_record(&mut fields, &mut records, record_line);
                line += 1;
                record_line = line;
            }
            _ => {}
        }
    }

    if field_start < buf.len() || !fields.is_empty() {
        fields.push(unquote(&buf[field_start..]));
        end_record(&mut fields, &mut records, record_line);
    }

    records
}

fn end_record(fields: &mut Vec<String>, records: &mut Vec<(usize, Vec<String>)>, at: usize) {
    let record = std::mem::take(fields);
    if !(record.len() == 1 && record[0].is_empty()) {
        records.push((at, record));
    }
}

fn unquote(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Value;

    fn load_str(csv: &str, required: &[&str]) -> Result<LoadedTable, ProcessorError> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        // write CSV to temp file
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "{}", csv).unwrap();
        let required: Vec<String> = required.iter().map(|s| s.to_string()).collect();
        load_csv(tmp.path(), &required)
    }

    #[test]
    fn test_row_count() {
        let csv = "id,value\n1,10\n2,20\n3,30\n";
        let loaded = load_str(csv, &[]).unwrap();
        assert_eq!(loaded.table.row_count(), 3);
        assert_eq!(loaded.summary.rows_processed, 3);
    }

    #[test]
    fn test_quoted_thousands_stay_text() {
        let csv = "title,gross\n\"Heat, Part 1\",\"1,000,000\"\nB,\"2,000\"\n";
        let t = load_str(csv, &["gross"]).unwrap().table;
        assert_eq!(t.value(0, "title").unwrap(), Value::Str("Heat, Part 1".into()));
        assert_eq!(t.value(0, "gross").unwrap(), Value::Str("1,000,000".into()));
    }

    #[test]
    fn test_type_inference_and_empty_cells() {
        let csv = "a,b,c\r\n1,1.5,x\r\n2,,y\r\n,3,\r\n";
        let t = load_str(csv, &[]).unwrap().table;
        assert_eq!(t.get_col("a").unwrap().column_type(), ColumnType::Int64);
        assert_eq!(t.get_col("b").unwrap().column_type(), ColumnType::Float64);
        assert_eq!(t.get_col("c").unwrap().column_type(), ColumnType::Str);
        assert_eq!(t.value(2, "a").unwrap(), Value::Null);
        assert_eq!(t.value(1, "b").unwrap(), Value::Null);
        assert_eq!(t.value(2, "c").unwrap(), Value::Null);
    }

    #[test]
    fn test_escaped_quotes_and_embedded_newline() {
        let csv = "title,year\n\"The \"\"Big\"\" One\",1999\n\"Two\nLines\",2001\n";
        let t = load_str(csv, &[]).unwrap().table;
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.value(0, "title").unwrap(), Value::Str("The \"Big\" One".into()));
        assert_eq!(t.value(1, "title").unwrap(), Value::Str("Two\nLines".into()));
    }

    #[test]
    fn test_ragged_rows_are_reported() {
        let csv = "a,b\n1,2\n3\n4,5\n\n";
        let loaded = load_str(csv, &[]).unwrap();
        assert_eq!(loaded.table.row_count(), 2);
        assert_eq!(loaded.summary.errors.len(), 1);
        assert_eq!(loaded.summary.errors[0].row, 3);
    }

    #[test]
    fn test_missing_file() {
        let res = load_csv(Path::new("definitely/not/here.csv"), &[]);
        assert!(matches!(res, Err(ProcessorError::SourceNotFound(_))));
    }

    #[test]
    fn test_missing_required_column() {
        let res = load_str("title,year\nA,2000\n", &["title", "Gross"]);
        match res {
            Err(ProcessorError::SchemaMissing(col)) => assert_eq!(col, "Gross"),
            other => panic!("expected SchemaMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_source() {
        let res = load_str("", &[]);
        assert!(matches!(res, Err(ProcessorError::MissingHeader)));
    }

    #[test]
    fn test_header_only() {
        let t = load_str("a,b\n", &["a"]).unwrap().table;
        assert!(t.is_empty());
        assert_eq!(t.headers(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_literal() {
        let csv = "title,year\n12\" Single,2000\nB,2001\n\"C \"\"x\"\"\",2002\n";
        let loaded = load_str(csv, &[]).unwrap();
        assert!(loaded.summary.errors.is_empty());
        let t = loaded.table;
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.value(0, "title").unwrap(), Value::Str("12\" Single".into()));
        assert_eq!(t.value(1, "year").unwrap(), Value::Int(2001));
        assert_eq!(t.value(2, "title").unwrap(), Value::Str("C \"x\"".into()));
    }

    #[test]
    fn test_byte_order_mark_is_skipped() {
        let loaded = parse_csv("\u{feff}title,year\nA,2000\n".as_bytes(), &["title".into()]).unwrap();
        assert_eq!(loaded.table.headers()[0], "title");
        assert_eq!(loaded.table.value(0, "title").unwrap(), Value::Str("A".into()));
    }
}
