//! JSON and CSV export of simulation results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::result::SimulationResult;

/// Column header for the daily-profile CSV export.
const PROFILE_HEADER: &str = "hour,load_kwh,generation_kwh";

/// Exports the full simulation result as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_result_json(result: &SimulationResult, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_result_json(result, buf)
}

/// Writes the full simulation result as pretty-printed JSON to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_result_json(result: &SimulationResult, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, result)?;
    writeln!(writer)?;
    Ok(())
}

/// Exports the representative daily profiles to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_profiles_csv(result: &SimulationResult, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_profiles_csv(result, buf)
}

/// Writes the representative daily profiles as CSV to any writer: a header
/// row followed by one row per hour of day. Deterministic for identical
/// inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_profiles_csv(result: &SimulationResult, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(PROFILE_HEADER.split(','))?;
    let profiles = &result.profiles;
    for (hour, (load, generation)) in profiles
        .load_profile
        .iter()
        .zip(&profiles.gen_profile)
        .enumerate()
    {
        wtr.write_record(&[
            hour.to_string(),
            format!("{load:.4}"),
            format!("{generation:.4}"),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
