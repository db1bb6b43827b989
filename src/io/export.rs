//! Write flood records back to CSV.
//!
//! Used for the cleaned table (`levee clean`) and for simulated samples
//! (`levee simulate`). Columns: `year,discharge,height`; a missing discharge is
//! an empty field.

use std::fs::File;
use std::path::Path;

use crate::domain::Sample;
use crate::error::AppError;
use crate::io::ingest::FloodRecord;

/// Write records to a CSV file (with header).
pub fn write_records_csv(path: &Path, records: &[FloodRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))?;
    Ok(())
}

/// Label a sample with consecutive years starting at `first_year`.
pub fn sample_to_records(sample: &Sample, first_year: i32) -> Vec<FloodRecord> {
    sample
        .values()
        .iter()
        .zip(first_year..)
        .map(|(&height, year)| FloodRecord {
            year,
            discharge: None,
            height,
        })
        .collect()
}
