//! In-memory tabular model plus CSV, XLSX, and JSON loaders.
//!
//! Every input shape is reduced to the same `Table` of `Cell` scalars so the
//! normalizer and the baseline comparator share one comparison unit.

use std::fmt;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use indexmap::IndexSet;
use serde_json::Value;

use crate::errors::CollectError;
use crate::types::SheetName;

/// One scalar cell.
///
/// `Empty` covers blank cells and NaN values; both count as missing.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// Missing value (blank or NaN).
    Empty,
    /// Finite or infinite numeric value; NaN never appears here.
    Number(f64),
    /// Text that did not parse as a number.
    Text(String),
    /// Boolean value (JSON and XLSX only).
    Bool(bool),
}

impl Cell {
    /// True for blank/NaN cells.
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric view: numbers directly, text through a float parse.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => text.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Text(text) => f.write_str(text),
            Cell::Bool(value) => write!(f, "{value}"),
        }
    }
}

const EMPTY_CELL: Cell = Cell::Empty;

/// A named-column table of cells. Rows may be ragged; out-of-range cells
/// read as `Empty`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Column names as they appear in the source.
    pub columns: Vec<String>,
    /// Row-major cells.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// True when the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (rows, columns) count.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// Index of an exactly named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cell at (row, column), `Empty` when out of range.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

fn parse_error(path: &Path, reason: impl fmt::Display) -> CollectError {
    CollectError::Parse {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn parse_scalar(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_nan() => Cell::Empty,
        Ok(value) => Cell::Number(value),
        Err(_) => Cell::Text(trimmed.to_string()),
    }
}

/// Load a CSV file as a single table; the first row is the header.
pub fn load_csv(path: &Path) -> Result<Table, CollectError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|err| parse_error(path, err))?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(|err| parse_error(path, err))?
        .iter()
        .map(|header| header.to_string())
        .collect();
    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record.map_err(|err| parse_error(path, err))?;
        table
            .rows
            .push(record.iter().map(parse_scalar).collect());
    }
    Ok(table)
}

fn header_label(data: &Data, index: usize) -> String {
    match data {
        Data::String(text) => text.clone(),
        Data::Empty => format!("column_{index}"),
        other => other.to_string(),
    }
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Float(value) if value.is_nan() => Cell::Empty,
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(value) => Cell::Bool(*value),
        Data::String(text) => parse_scalar(text),
        Data::DateTime(datetime) => Cell::Number(datetime.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}

/// Load every sheet of a workbook as an independent table.
pub fn load_workbook(path: &Path) -> Result<Vec<(SheetName, Table)>, CollectError> {
    let mut workbook = open_workbook_auto(path).map_err(|err| parse_error(path, err))?;
    let names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|err| parse_error(path, err))?;
        let mut rows = range.rows();
        let columns = rows
            .next()
            .map(|header| {
                header
                    .iter()
                    .enumerate()
                    .map(|(index, data)| header_label(data, index))
                    .collect()
            })
            .unwrap_or_default();
        let mut table = Table::new(columns);
        for row in rows {
            table.rows.push(row.iter().map(data_to_cell).collect());
        }
        sheets.push((name, table));
    }
    Ok(sheets)
}

fn value_to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Bool(flag) => Cell::Bool(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(v) if v.is_nan() => Cell::Empty,
            Some(v) => Cell::Number(v),
            None => Cell::Empty,
        },
        Value::String(text) => parse_scalar(text),
        nested => Cell::Text(nested.to_string()),
    }
}

/// Flatten one object one level deep: nested object fields become
/// `parent.child` columns; anything deeper is stringified.
fn flatten_object(object: &serde_json::Map<String, Value>) -> Vec<(String, Cell)> {
    let mut fields = Vec::new();
    for (key, value) in object {
        match value {
            Value::Object(nested) => {
                for (child, child_value) in nested {
                    fields.push((format!("{key}.{child}"), value_to_cell(child_value)));
                }
            }
            other => fields.push((key.clone(), value_to_cell(other))),
        }
    }
    fields
}

/// Load a JSON file as a single table via one-level normalization.
///
/// An object becomes one row; an array of objects becomes one row each with
/// the union of their columns; scalars fall back to a single `value` column.
pub fn load_json(path: &Path) -> Result<Table, CollectError> {
    let raw = std::fs::read_to_string(path).map_err(|err| parse_error(path, err))?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| parse_error(path, err))?;

    let row_objects: Vec<Vec<(String, Cell)>> = match &value {
        Value::Object(object) => vec![flatten_object(object)],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(object) => flatten_object(object),
                scalar => vec![("value".to_string(), value_to_cell(scalar))],
            })
            .collect(),
        scalar => vec![vec![("value".to_string(), value_to_cell(scalar))]],
    };

    let mut columns: IndexSet<String> = IndexSet::new();
    for row in &row_objects {
        for (name, _) in row {
            columns.insert(name.clone());
        }
    }
    let columns: Vec<String> = columns.into_iter().collect();
    let mut table = Table::new(columns.clone());
    for row in row_objects {
        let mut cells = vec![Cell::Empty; columns.len()];
        for (name, cell) in row {
            if let Some(index) = columns.iter().position(|column| column == &name) {
                cells[index] = cell;
            }
        }
        table.rows.push(cells);
    }
    Ok(table)
}

/// Load any supported result file as (sheet, table) pairs.
///
/// CSV and JSON yield a single unnamed table; workbooks yield one entry per
/// sheet with the sheet name propagated.
pub fn load_tables(path: &Path) -> Result<Vec<(Option<SheetName>, Table)>, CollectError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => Ok(vec![(None, load_csv(path)?)]),
        "xlsx" | "xls" => Ok(load_workbook(path)?
            .into_iter()
            .map(|(name, table)| (Some(name), table))
            .collect()),
        "json" => Ok(vec![(None, load_json(path)?)]),
        other => Err(parse_error(path, format!("unsupported file type '{other}'"))),
    }
}
