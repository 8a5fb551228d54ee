use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Utc;
use tracing::{debug, info};

use crate::models::{CellValue, RowRecord, Upload, BLOCK_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Workbook,
    Csv,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SheetFormat::Workbook),
            "csv" => Ok(SheetFormat::Csv),
            _ => bail!(
                "unsupported file type for {} (expected .xlsx, .xls, .ods or .csv)",
                path.display()
            ),
        }
    }
}

/// Reads the whole file and turns its first sheet into row records.
pub async fn read_upload(path: &Path) -> anyhow::Result<Upload> {
    let format = SheetFormat::from_path(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let rows = parse_rows(bytes, format)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    info!(file = %file_name, rows = rows.len(), "loaded upload");

    Ok(Upload {
        file_name,
        rows,
        loaded_at: Utc::now(),
    })
}

pub fn parse_rows(bytes: Vec<u8>, format: SheetFormat) -> anyhow::Result<Vec<RowRecord>> {
    match format {
        SheetFormat::Workbook => parse_workbook(bytes),
        SheetFormat::Csv => parse_csv(&bytes),
    }
}

fn parse_workbook(bytes: Vec<u8>) -> anyhow::Result<Vec<RowRecord>> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).context("not a readable spreadsheet")?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("spreadsheet contains no sheets")?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("failed to read sheet '{sheet_name}'"))?;
    debug!(sheet = %sheet_name, size = ?range.get_size(), "reading first sheet");

    Ok(rows_from_cells(
        range.rows().map(|row| row.iter().map(cell_value).collect()),
    ))
}

fn parse_csv(bytes: &[u8]) -> anyhow::Result<Vec<RowRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut cells = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("malformed CSV record {}", line + 1))?;
        cells.push(
            record
                .iter()
                .map(|field| (!field.is_empty()).then(|| CellValue::from(field)))
                .collect(),
        );
    }

    Ok(rows_from_cells(cells))
}

fn cell_value(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            Some(CellValue::Text(s.clone()))
        }
        Data::Float(n) => Some(CellValue::Number(*n)),
        Data::Int(n) => Some(CellValue::Number(*n as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
    }
}

/// Keys each data row by the first non-empty row's header names.
///
/// Empty cells are left out of the record and rows with nothing left are
/// dropped. Headerless columns are ignored; a repeated header gets a `_1`,
/// `_2`, ... suffix.
pub fn rows_from_cells<I>(rows: I) -> Vec<RowRecord>
where
    I: IntoIterator<Item = Vec<Option<CellValue>>>,
{
    let mut rows = rows
        .into_iter()
        .skip_while(|cells| cells.iter().all(Option::is_none));

    let Some(header_cells) = rows.next() else {
        return Vec::new();
    };
    let headers = header_names(&header_cells);

    rows.filter_map(|cells| {
        let record: RowRecord = headers
            .iter()
            .zip(cells)
            .filter_map(|(header, cell)| Some((header.clone()?, cell?)))
            .collect();
        (!record.is_empty()).then_some(record)
    })
    .collect()
}

fn header_names(cells: &[Option<CellValue>]) -> Vec<Option<String>> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    cells
        .iter()
        .map(|cell| {
            let name = cell.as_ref()?.to_string();
            if name.is_empty() {
                return None;
            }
            let repeats = seen.entry(name.clone()).or_insert(0);
            let unique = if *repeats == 0 {
                name
            } else {
                format!("{name}_{repeats}")
            };
            *repeats += 1;
            Some(unique)
        })
        .collect()
}

/// Distinct non-empty `Block` labels in the order they first appear.
pub fn distinct_blocks(rows: &[RowRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(BLOCK_COLUMN))
        .filter(|cell| is_present(cell))
        .map(ToString::to_string)
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

fn is_present(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(s) => !s.is_empty(),
        CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
        CellValue::Bool(b) => *b,
    }
}
