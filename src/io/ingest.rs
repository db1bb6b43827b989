//! CSV ingest and cleaning of historical flood records.
//!
//! Turns a yearly flood table (`year`, `height`, optional `discharge`) into
//! clean records whose heights form the [`Sample`] handed to the engine.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (drop bad rows, but report what happened)
//! - **Tolerant number parsing** (decimal commas, `;` separated exports)
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Sample;
use crate::error::{AppError, EngineError};

/// One cleaned row of the flood table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodRecord {
    pub year: i32,
    #[serde(default)]
    pub discharge: Option<f64>,
    pub height: f64,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: clean records (file order) + dropped rows.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedData {
    pub records: Vec<FloodRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Whether the source had a discharge column at all.
    pub has_discharge: bool,
}

impl IngestedData {
    pub fn rows_used(&self) -> usize {
        self.records.len()
    }

    /// Heights in file order.
    pub fn sample(&self) -> Result<Sample, EngineError> {
        Sample::new(self.records.iter().map(|r| r.height).collect())
    }

    /// First and last year present, if any.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let min = self.records.iter().map(|r| r.year).min()?;
        let max = self.records.iter().map(|r| r.year).max()?;
        Some((min, max))
    }
}

const YEAR_COLUMNS: [&str; 2] = ["year", "annee"];
const HEIGHT_COLUMNS: [&str; 2] = ["height", "hauteur"];
const DISCHARGE_COLUMNS: [&str; 2] = ["discharge", "debit"];

/// Load and clean a flood CSV from disk.
pub fn load_flood_records(path: &Path) -> Result<IngestedData, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let data = parse_flood_csv(&text)?;
    debug!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.rows_used(),
        "flood records loaded"
    );
    Ok(data)
}

/// Parse and clean flood CSV text.
pub fn parse_flood_csv(text: &str) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let year_idx = find_column(&header_map, &YEAR_COLUMNS)?;
    let height_idx = find_column(&header_map, &HEIGHT_COLUMNS)?;
    let discharge_idx = DISCHARGE_COLUMNS.iter().find_map(|c| header_map.get(*c).copied());

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let outcome = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, year_idx, height_idx, discharge_idx));
        match outcome {
            Ok(rec) => records.push(rec),
            Err(message) => {
                warn!(line, %message, "dropping row");
                row_errors.push(RowError { line, message });
            }
        }
    }

    if records.is_empty() {
        return Err(AppError::new(3, "No valid rows remain after cleaning."));
    }

    Ok(IngestedData {
        records,
        row_errors,
        rows_read,
        has_discharge: discharge_idx.is_some(),
    })
}

/// `;` when the header line uses it and has no `,` (spreadsheet exports with decimal commas).
fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often carry a BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}').to_lowercase();
    // Accented variants: "Année", "Débit".
    name.replace(['é', 'è'], "e")
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Result<usize, AppError> {
    names
        .iter()
        .find_map(|n| header_map.get(*n).copied())
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("Missing required column: `{}`", names.join("` or `")),
            )
        })
}

fn parse_row(
    record: &StringRecord,
    year_idx: usize,
    height_idx: usize,
    discharge_idx: Option<usize>,
) -> Result<FloodRecord, String> {
    let year = parse_year(get_required(record, year_idx, "year")?)?;
    let height = parse_number(get_required(record, height_idx, "height")?, "height")?;
    // Discharge never feeds the fit; a blank cell keeps the row.
    let discharge = match discharge_idx.and_then(|i| get_optional(record, i)) {
        Some(s) => Some(parse_number(s, "discharge")?),
        None => None,
    };
    Ok(FloodRecord {
        year,
        discharge,
        height,
    })
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    get_optional(record, idx).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional(record: &StringRecord, idx: usize) -> Option<&str> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("na") && !s.eq_ignore_ascii_case("nan"))
}

fn parse_year(s: &str) -> Result<i32, String> {
    if let Ok(y) = s.parse::<i32>() {
        return Ok(y);
    }
    // Spreadsheets sometimes store years as floats ("1998.0").
    match s.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.abs() < i32::MAX as f64 => Ok(v as i32),
        _ => Err(format!("Invalid `year` value '{s}'")),
    }
}

fn parse_number(s: &str, name: &str) -> Result<f64, String> {
    let v: f64 = s
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("Invalid `{name}` value '{s}'"))?;
    if !v.is_finite() {
        return Err(format!("Non-finite `{name}` value '{s}'"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_drops_bad_rows() {
        let csv = "Year,Discharge,Height\n\
                   1950,1200,1.2\n\
                   1951,,1.5\n\
                   1952,900,abc\n\
                   1953,1100,\n\
                   1954,1300,1.8\n";
        let data = parse_flood_csv(csv).unwrap();
        assert_eq!(data.rows_read, 5);
        assert_eq!(data.rows_used(), 3);
        assert!(data.has_discharge);
        assert_eq!(data.records[1].discharge, None);
        assert_eq!(
            data.row_errors.iter().map(|e| e.line).collect::<Vec<_>>(),
            vec![4, 5]
        );
        assert!(data.row_errors[0].message.contains("height"));
        assert_eq!(data.sample().unwrap().values(), &[1.2, 1.5, 1.8]);
        assert_eq!(data.year_span(), Some((1950, 1954)));
    }

    #[test]
    fn french_headers_semicolons_and_decimal_commas() {
        let csv = "\u{feff}Année;Débit;Hauteur\n1998.0;1 200;2,5\n1999;800;1,75\n";
        let data = parse_flood_csv(csv).unwrap();
        // "1 200" is not a number: that row is dropped.
        assert_eq!(data.rows_used(), 1);
        assert_eq!(data.records[0].year, 1999);
        assert_eq!(data.records[0].height, 1.75);
        assert_eq!(data.records[0].discharge, Some(800.0));
    }

    #[test]
    fn missing_height_column_is_an_input_error() {
        let err = parse_flood_csv("year,discharge\n1950,12\n").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("height"));
    }

    #[test]
    fn all_rows_invalid_is_exit_3() {
        let err = parse_flood_csv("year,height\n1950,NaN\n1951,x\n").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn discharge_column_is_optional() {
        let data = parse_flood_csv("annee,hauteur\n2001,3.25\n").unwrap();
        assert!(!data.has_discharge);
        assert_eq!(data.records[0].discharge, None);
    }
}
