use std::collections::hash_map::Entry;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::models::{Cell, HeaderRow, Table, Workbook};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Tracker,
    Observations,
}

/// Tracker CSVs are headerless and land in `tracker_sheet`.
pub fn read_table(path: &Path, source: Source, tracker_sheet: &str) -> Result<Table> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let file = std::fs::File::open(path)?;
    let table = match (extension.as_str(), source) {
        ("json", _) => from_json(serde_json::from_reader(std::io::BufReader::new(file))?)?,
        ("csv", Source::Tracker) => csv_matrix(file, tracker_sheet)?,
        ("csv", Source::Observations) => csv_rows(file)?,
        _ => {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "{} is not a .csv or .json file",
                path.display()
            )))
        }
    };

    debug!(path = %path.display(), shape = table.shape(), "decoded input");
    Ok(table)
}

pub fn csv_rows<R: Read>(reader: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = HeaderRow::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            if header.is_empty() {
                continue;
            }
            // Repeated headers keep the first non-blank value.
            let cell = Cell::from(value);
            match row.entry(header.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(cell);
                }
                Entry::Occupied(mut slot) => {
                    if slot.get().is_blank() {
                        slot.insert(cell);
                    }
                }
            }
        }
        rows.push(row);
    }
    Ok(Table::Rows(rows))
}

pub fn csv_matrix<R: Read>(reader: R, sheet: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(Cell::from).collect());
    }

    let mut workbook = Workbook::default();
    workbook.sheets.insert(sheet.to_string(), rows);
    Ok(Table::Workbook(workbook))
}

pub fn from_json(value: Value) -> Result<Table> {
    match value {
        Value::Array(items) => {
            let mut rows = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let Value::Object(object) = item else {
                    return Err(AnalysisError::UnsupportedFormat(format!(
                        "row {} is not an object",
                        index + 1
                    )));
                };
                rows.push(
                    object
                        .into_iter()
                        .map(|(key, value)| (key.trim().to_string(), json_cell(value)))
                        .collect(),
                );
            }
            Ok(Table::Rows(rows))
        }
        Value::Object(mut object) => {
            let sheets = match object.remove("sheets") {
                Some(Value::Object(sheets)) => sheets,
                Some(_) => {
                    return Err(AnalysisError::UnsupportedFormat(
                        "\"sheets\" must be an object of named sheets".to_string(),
                    ))
                }
                None => object,
            };

            let mut named = BTreeMap::new();
            for (name, sheet) in sheets {
                named.insert(name.clone(), json_sheet(&name, sheet)?);
            }
            if named.is_empty() {
                return Err(AnalysisError::UnsupportedFormat(
                    "workbook has no sheets".to_string(),
                ));
            }
            Ok(Table::Workbook(Workbook { sheets: named }))
        }
        other => Err(AnalysisError::UnsupportedFormat(format!(
            "expected an array of rows or a workbook object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_sheet(name: &str, sheet: Value) -> Result<Vec<Vec<Cell>>> {
    let Value::Array(rows) = sheet else {
        return Err(AnalysisError::UnsupportedFormat(format!(
            "sheet \"{name}\" is not an array of rows"
        )));
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Array(cells) => Ok(cells.into_iter().map(json_cell).collect()),
            other => Err(AnalysisError::UnsupportedFormat(format!(
                "sheet \"{name}\" row {} is {}, not an array of cells",
                index + 1,
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Blank,
        Value::Number(number) => number.as_f64().map(Cell::Number).unwrap_or_default(),
        Value::String(text) => Cell::from(text.as_str()),
        Value::Bool(flag) => Cell::Text(flag.to_string()),
        nested => Cell::Text(nested.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
