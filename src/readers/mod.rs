pub mod csv;
pub mod pcaxis;

use std::path::Path;

use crate::types::{FileFormat, ObservedValue, Result, Selection};

/// Common trait for statistics sources that yield one value per region
pub trait ObservedReader {
    /// Read the region values of the selected slice
    fn read_observed(&mut self, selection: &Selection) -> Result<Vec<ObservedValue>>;
}

fn detect_format(path: &Path) -> Result<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    FileFormat::from_extension(ext).ok_or_else(|| {
        crate::error::Error::UnsupportedFormat(format!(
            "Unsupported file extension: .{}",
            ext
        ))
    })
}

/// Create a statistics reader for the given file path
pub fn create_observed_reader(path: &Path) -> Result<Box<dyn ObservedReader>> {
    match detect_format(path)? {
        FileFormat::Csv => Ok(Box::new(csv::CsvReader::new(path)?)),
        FileFormat::Tsv => Ok(Box::new(csv::CsvReader::new_tsv(path)?)),
        FileFormat::PcAxis => Ok(Box::new(pcaxis::PcAxisReader::new(path)?)),
    }
}

/// Read the canonical region names from a geometry attribute table
pub fn read_canonical_names(path: &Path, field: &str) -> Result<Vec<String>> {
    match detect_format(path)? {
        FileFormat::Csv => csv::CsvReader::new(path)?.read_column(field),
        FileFormat::Tsv => csv::CsvReader::new_tsv(path)?.read_column(field),
        FileFormat::PcAxis => Err(crate::error::Error::UnsupportedFormat(
            "canonical names must come from a CSV/TSV attribute table".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".shp").unwrap();
        assert!(create_observed_reader(file.path()).is_err());
        assert!(read_canonical_names(file.path(), "NAMEUNIT").is_err());
    }

    #[test]
    fn test_canonical_from_tsv() {
        let mut file = NamedTempFile::with_suffix(".tsv").unwrap();
        write!(file, "CODNUT3\tNAMEUNIT\nES511\tBarcelona\nES512\tGirona\n").unwrap();

        let names = read_canonical_names(file.path(), "NAMEUNIT").unwrap();
        assert_eq!(names, vec!["Barcelona", "Girona"]);
    }
}
