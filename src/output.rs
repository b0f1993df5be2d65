use crate::report::ReconReport;
use crate::types::Result;
use std::io::Write;
use std::path::Path;

/// Write report to JSON file
pub fn write_json_file(report: &ReconReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Write report to JSON string
pub fn to_json_string(report: &ReconReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write report to stdout
pub fn write_json_stdout(report: &ReconReport) -> Result<()> {
    let json = to_json_string(report)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json)?;
    Ok(())
}
