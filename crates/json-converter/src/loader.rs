//! Tabular input loading.
//!
//! Delimited text is read with polars, spreadsheets with calamine. Both end up
//! as a list of [`Row`]s whose column order follows the header row.

use crate::error::{ConversionError, Result};
use crate::types::Row;
use calamine::{Data, Reader, open_workbook_auto};
use chrono::{NaiveDateTime, NaiveTime};
use polars::prelude::*;
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Type inference attempts for delimited text, tried in order: a scan of the
/// whole file, then every column read as text.
const INFER_SCHEMA_STRATEGIES: [Option<usize>; 2] = [None, Some(0)];

/// Kind of tabular file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    /// Comma separated text.
    Csv,
    /// Tab separated text.
    Tsv,
    /// Excel / OpenDocument workbook; the first worksheet is used.
    Spreadsheet,
}

impl TabularFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

/// Load every row of a CSV / TSV / spreadsheet file.
pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let format = TabularFormat::from_path(path).ok_or_else(|| load_error(path, "unsupported file type"))?;

    info!("Loading rows from: {}", path.display());
    let rows = match format {
        TabularFormat::Csv | TabularFormat::Tsv => {
            let df = read_delimited(path, format).map_err(|e| load_error(path, e))?;
            dataframe_to_rows(&df)?
        }
        TabularFormat::Spreadsheet => {
            let (headers, body) = read_spreadsheet(path).map_err(|e| load_error(path, e))?;
            body.into_iter()
                .map(|cells| {
                    headers
                        .iter()
                        .cloned()
                        .zip(cells.iter().map(cell_to_json).chain(std::iter::repeat(Value::Null)))
                        .collect()
                })
                .collect()
        }
    };

    info!("Loaded {} rows", rows.len());
    Ok(rows)
}

/// Read only the header row of a tabular file, in file order.
///
/// `format` is used as given; callers decide how to treat unknown extensions.
pub fn read_headers(path: &Path, format: TabularFormat) -> std::result::Result<Vec<String>, String> {
    match format {
        TabularFormat::Csv | TabularFormat::Tsv => {
            let df = read_delimited(path, format)?;
            Ok(df.get_column_names().iter().map(|s| s.to_string()).collect())
        }
        TabularFormat::Spreadsheet => read_spreadsheet(path).map(|(headers, _)| headers),
    }
}

fn load_error(path: &Path, reason: impl ToString) -> ConversionError {
    ConversionError::Load {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn read_delimited(path: &Path, format: TabularFormat) -> std::result::Result<DataFrame, String> {
    let separator = if format == TabularFormat::Tsv { b'\t' } else { b',' };

    let mut last_error = String::from("no read strategy attempted");
    for infer_schema_length in INFER_SCHEMA_STRATEGIES {
        match CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(infer_schema_length)
            .with_parse_options(
                CsvParseOptions::default()
                    .with_separator(separator)
                    .with_quote_char(Some(b'"')),
            )
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))
            .and_then(|reader| reader.finish())
        {
            Ok(df) => return Ok(df),
            Err(e) => {
                debug!(
                    "Reading {} with infer_schema_length {:?} failed: {}",
                    path.display(),
                    infer_schema_length,
                    e
                );
                last_error = e.to_string();
            }
        }
    }
    Err(last_error)
}

fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<Row>> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let columns = df.get_columns();
    debug!("Converting {} x {} frame to rows", df.height(), names.len());

    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut pairs = Vec::with_capacity(names.len());
        for (name, column) in names.iter().zip(columns) {
            let value = column.as_materialized_series().get(idx)?;
            pairs.push((name.clone(), any_value_to_json(value)));
        }
        rows.push(pairs.into_iter().collect());
    }
    Ok(rows)
}

fn any_value_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int8(v) => v.into(),
        AnyValue::Int16(v) => v.into(),
        AnyValue::Int32(v) => v.into(),
        AnyValue::Int64(v) => v.into(),
        AnyValue::UInt8(v) => v.into(),
        AnyValue::UInt16(v) => v.into(),
        AnyValue::UInt32(v) => v.into(),
        AnyValue::UInt64(v) => v.into(),
        AnyValue::Float32(v) => float_to_json(f64::from(v)),
        AnyValue::Float64(v) => float_to_json(v),
        other => Value::String(other.to_string()),
    }
}

/// Non-finite floats have no JSON form and become null.
fn float_to_json(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

type SheetContents = (Vec<String>, Vec<Vec<Data>>);

fn read_spreadsheet(path: &Path) -> std::result::Result<SheetContents, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "no worksheet found".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|cells| {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| header_name(i, cell))
                .collect()
        })
        .unwrap_or_default();

    Ok((headers, rows.map(<[Data]>::to_vec).collect()))
}

fn header_name(position: usize, cell: &Data) -> String {
    match cell {
        Data::Empty => format!("column_{}", position + 1),
        Data::String(s) if s.trim().is_empty() => format!("column_{}", position + 1),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => (*i).into(),
        Data::Float(f) => float_to_json(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(_) => Value::Null,
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Value::String(iso_datetime(datetime)),
            None => Value::String(cell.to_string()),
        },
        Data::DateTimeIso(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

/// Date-only cells (midnight) drop the time part.
fn iso_datetime(datetime: NaiveDateTime) -> String {
    if datetime.time() == NaiveTime::MIN {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}
