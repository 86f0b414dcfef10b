use anyhow::{Context, Result};
use arrow::array::{Array, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use serde_json::Value;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::analysis::clean_records;
use crate::models::{RawRow, Record};
use crate::Error;

const BATCH_SIZE: usize = 1024;

/// Bundled dataset used when the configured source cannot be read.
pub const EMBEDDED_CSV: &str = include_str!("../../data/nyc_median_rent.csv");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Embedded,
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub rows: Vec<RawRow>,
    pub records: Vec<Record>,
    pub source: DataSource,
}

/// Parses CSV text with a header row into untyped rows. Lines starting with `#` are skipped
/// and every cell is kept as text; empty cells become null.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RawRow>, Error> {
    let format = Format::default().with_header(true).with_comment(b'#');
    let (inferred, _) = format.infer_schema(Cursor::new(bytes), None)?;

    let schema = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .with_comment(b'#')
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(bytes))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        let columns = (0..batch.num_columns())
            .map(|idx| {
                batch
                    .column(idx)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| Error::Csv(format!("column {} is not text", schema.field(idx).name())))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        for i in 0..batch.num_rows() {
            let row: RawRow = schema
                .fields()
                .iter()
                .zip(&columns)
                .map(|(field, column)| {
                    let value = if column.is_null(i) {
                        Value::Null
                    } else {
                        Value::String(column.value(i).to_string())
                    };
                    (field.name().clone(), value)
                })
                .collect();
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Parses a JSON array of objects. Non-object elements are skipped.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<RawRow>, Error> {
    let values: Vec<Value> = serde_json::from_slice(bytes)?;
    Ok(values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

/// Reads raw rows from a `.json` file, or from CSV for any other extension.
pub async fn load_rows(path: &Path) -> Result<Vec<RawRow>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Unable to read {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let rows = if is_json {
        parse_json(&bytes)
    } else {
        parse_csv(&bytes)
    }
    .with_context(|| format!("Unable to parse {}", path.display()))?;

    info!("Loaded {} raw rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn embedded_rows() -> Vec<RawRow> {
    match parse_csv(EMBEDDED_CSV.as_bytes()) {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to parse embedded dataset: {}", e);
            Vec::new()
        }
    }
}

pub fn embedded_data() -> LoadedData {
    let rows = embedded_rows();
    let records = clean_records(&rows);
    LoadedData { rows, records, source: DataSource::Embedded }
}

/// Loads and cleans `path`, falling back to the embedded dataset when the file cannot be
/// read or yields no valid records.
pub async fn load_records_or_embedded(path: &Path) -> LoadedData {
    match load_rows(path).await {
        Ok(rows) => {
            let records = clean_records(&rows);
            if records.is_empty() {
                warn!("No valid records in {}; falling back to embedded data", path.display());
                return embedded_data();
            }
            info!("Cleaned {} of {} rows from {}", records.len(), rows.len(), path.display());
            LoadedData { rows, records, source: DataSource::File(path.to_path_buf()) }
        }
        Err(e) => {
            warn!("Falling back to embedded data because of {:#}", e);
            embedded_data()
        }
    }
}
