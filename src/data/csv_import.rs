//! CSV import of per-meter time-series matrices.
//!
//! Expected layout: a header row `timestamp,<meter>,<meter>,...` followed
//! by one row per timestamp, e.g. `2024-06-01T13:00:00,0.42,1.07,...`.
//! All rows must carry the same number of meter columns.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDateTime, Timelike};

use super::matrix::{SimTimestamp, TimeMatrix};
use crate::error::SimError;

/// Accepted timestamp layouts, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

fn parse_timestamp(raw: &str) -> Result<SimTimestamp, String> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(SimTimestamp::new(dt.month(), dt.day(), dt.hour()));
        }
    }
    Err(format!("unrecognized timestamp \"{raw}\""))
}

/// Reads a per-meter matrix from a CSV file.
///
/// # Errors
///
/// Returns [`SimError::Io`] if the file cannot be opened and
/// [`SimError::Parse`] for malformed headers, timestamps, or values.
pub fn read_matrix_csv(path: &Path) -> Result<TimeMatrix, SimError> {
    let file = File::open(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_matrix(file).map_err(|message| SimError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Reads a per-meter matrix from any reader. Errors are plain messages;
/// [`read_matrix_csv`] attaches the file path.
pub fn read_matrix(reader: impl Read) -> Result<TimeMatrix, String> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);

    let headers = rdr.headers().map_err(|e| e.to_string())?.clone();
    if headers.len() < 2 {
        return Err("expected a timestamp column plus at least one meter column".to_string());
    }
    let cols = headers.len() - 1;

    let mut timestamps = Vec::new();
    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() != cols + 1 {
            return Err(format!(
                "row {}: expected {} columns, found {}",
                line + 2,
                cols + 1,
                record.len()
            ));
        }
        timestamps.push(parse_timestamp(&record[0]).map_err(|e| format!("row {}: {e}", line + 2))?);
        let mut row = Vec::with_capacity(cols);
        for value in record.iter().skip(1) {
            let kwh: f64 = value
                .trim()
                .parse()
                .map_err(|_| format!("row {}: \"{value}\" is not a number", line + 2))?;
            row.push(kwh);
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err("matrix contains no data rows".to_string());
    }
    Ok(TimeMatrix::from_rows(timestamps, rows))
}
