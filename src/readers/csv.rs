use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::Error;
use crate::types::{ObservedValue, Result, Selection};

use super::ObservedReader;

/// Default value column for long-format statistics tables
pub const DEFAULT_VALUE_COLUMN: &str = "Total";

/// CSV/TSV file reader
pub struct CsvReader {
    path: PathBuf,
    delimiter: u8,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b',',
        })
    }

    /// Create a new TSV reader
    pub fn new_tsv(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b'\t',
        })
    }

    fn create_reader(&self) -> Result<Reader<BufReader<File>>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let csv_reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Ok(csv_reader)
    }

    fn column_index(&self, headers: &StringRecord, column: &str) -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| Error::MissingColumn {
                file: self.path.display().to_string(),
                column: column.to_string(),
            })
    }

    /// Values of one column, in row order
    pub fn read_column(&mut self, column: &str) -> Result<Vec<String>> {
        let mut reader = self.create_reader()?;
        let idx = self.column_index(reader.headers()?, column)?;

        let mut values = Vec::new();
        for result in reader.records() {
            let record = result?;
            if let Some(field) = record.get(idx) {
                values.push(field.trim().to_string());
            }
        }
        Ok(values)
    }
}

impl ObservedReader for CsvReader {
    fn read_observed(&mut self, selection: &Selection) -> Result<Vec<ObservedValue>> {
        let mut reader = self.create_reader()?;
        let headers = reader.headers()?.clone();

        let region_idx = self.column_index(&headers, &selection.region)?;
        let value_column = selection
            .value_column
            .as_deref()
            .unwrap_or(DEFAULT_VALUE_COLUMN);
        let value_idx = self.column_index(&headers, value_column)?;
        let mut filters: Vec<(usize, &str)> = Vec::with_capacity(selection.filters.len());
        for (column, wanted) in &selection.filters {
            filters.push((self.column_index(&headers, column)?, wanted.as_str()));
        }

        let mut values = Vec::new();
        for result in reader.records() {
            let record = result?;
            let keep = filters
                .iter()
                .all(|(idx, wanted)| record.get(*idx).map(str::trim) == Some(*wanted));
            if !keep {
                continue;
            }

            let name = record.get(region_idx).unwrap_or("").trim();
            let value = record.get(value_idx).and_then(parse_value);
            values.push(ObservedValue::new(name, value));
        }

        debug!(
            file = %self.path.display(),
            rows = values.len(),
            "read observed values"
        );
        Ok(values)
    }
}

/// Parse a statistics cell, accepting Spanish thousands/decimal separators
pub fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return Some(v);
    }
    // "1.234.567,89" -> "1234567.89"
    let normalized = trimmed.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_column() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "id,NAMEUNIT\n1, Barcelona\n2,Castellón/Castelló\n").unwrap();

        let mut reader = CsvReader::new(file.path()).unwrap();
        let names = reader.read_column("NAMEUNIT").unwrap();
        assert_eq!(names, vec!["Barcelona", "Castellón/Castelló"]);
    }

    #[test]
    fn test_read_column_missing() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "id,name\n1,Barcelona\n").unwrap();

        let mut reader = CsvReader::new(file.path()).unwrap();
        let err = reader.read_column("NAMEUNIT").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }

    #[test]
    fn test_read_observed_long_format() {
        let mut file = NamedTempFile::with_suffix(".tsv").unwrap();
        write!(
            file,
            "Provincias\tSexo\tPeriodo\tTotal\n\
             08 Barcelona\tTotal\t2022\t5.714.730\n\
             08 Barcelona\tMujeres\t2022\t2.927.000\n\
             08 Barcelona\tTotal\t2021\t5.727.000\n\
             17 Girona\tTotal\t2022\t\n"
        )
        .unwrap();

        let selection = Selection::new("Provincias")
            .with_filter("Sexo", "Total")
            .with_filter("Periodo", "2022");
        let mut reader = CsvReader::new_tsv(file.path()).unwrap();
        let values = reader.read_observed(&selection).unwrap();

        assert_eq!(
            values,
            vec![
                ObservedValue::new("08 Barcelona", Some(5_714_730.0)),
                ObservedValue::new("17 Girona", None),
            ]
        );
    }

    #[test]
    fn test_read_observed_unknown_filter_column() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "Provincias,Total\n08 Barcelona,1\n").unwrap();

        let selection = Selection::new("Provincias").with_filter("Edad", "Total");
        let mut reader = CsvReader::new(file.path()).unwrap();
        assert!(reader.read_observed(&selection).is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Some(42.0));
        assert_eq!(parse_value("3.5"), Some(3.5));
        assert_eq!(parse_value("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_value("1.234,5"), Some(1234.5));
        assert_eq!(parse_value(".."), None);
        assert_eq!(parse_value(""), None);
    }
}
