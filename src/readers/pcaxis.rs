//! Reader for PC-Axis (`.px`) tables as published by statistics offices.
//!
//! A PX file is a list of `KEYWORD[lang]("subkey")=value;` statements. The
//! dimensions are declared by `STUB` and `HEADING`, their categories by
//! `VALUES("variable")`, and the cells by `DATA`, laid out row-major over the
//! stub variables followed by the heading variables.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Error;
use crate::types::{ObservedValue, Result, Selection};

use super::ObservedReader;

/// A single `KEYWORD[lang]("subkey")=value` statement
#[derive(Debug, Clone, PartialEq)]
struct Statement<'a> {
    keyword: &'a str,
    lang: Option<&'a str>,
    subkey: Option<String>,
    value: &'a str,
}

/// One dimension of a PX table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PxVariable {
    pub name: String,
    pub values: Vec<String>,
}

impl PxVariable {
    pub fn position(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

/// Parsed PX cube
#[derive(Debug, Clone, PartialEq)]
pub struct PxTable {
    pub title: Option<String>,

    /// Stub variables followed by heading variables
    pub variables: Vec<PxVariable>,

    pub data: Vec<Option<f64>>,
}

impl PxTable {
    pub fn parse(text: &str) -> Result<Self> {
        let mut title = None;
        let mut stub: Vec<String> = Vec::new();
        let mut heading: Vec<String> = Vec::new();
        let mut values: Vec<(String, Vec<String>)> = Vec::new();
        let mut data = None;

        for raw in split_statements(text) {
            let stmt = parse_statement(raw)?;
            // Translations repeat the metadata under KEYWORD[lang]
            if stmt.lang.is_some() {
                continue;
            }
            match stmt.keyword {
                "TITLE" => title = parse_strings(stmt.value).into_iter().next(),
                "STUB" => stub = parse_strings(stmt.value),
                "HEADING" => heading = parse_strings(stmt.value),
                "VALUES" => {
                    let name = stmt.subkey.ok_or_else(|| {
                        Error::PcAxis("VALUES without a variable name".to_string())
                    })?;
                    values.push((name, parse_strings(stmt.value)));
                }
                "DATA" => data = Some(parse_data(stmt.value)),
                _ => {}
            }
        }

        let data = data.ok_or_else(|| Error::PcAxis("missing DATA section".to_string()))?;

        let mut variables = Vec::with_capacity(stub.len() + heading.len());
        for name in stub.into_iter().chain(heading) {
            let idx = values
                .iter()
                .position(|(var, _)| *var == name)
                .ok_or_else(|| Error::PcAxis(format!("no VALUES for variable '{}'", name)))?;
            let (_, vals) = values.swap_remove(idx);
            variables.push(PxVariable { name, values: vals });
        }

        let expected: usize = variables.iter().map(|v| v.values.len()).product();
        if variables.is_empty() || expected != data.len() {
            return Err(Error::PcAxis(format!(
                "DATA has {} cells, dimensions require {}",
                data.len(),
                expected
            )));
        }

        Ok(Self {
            title,
            variables,
            data,
        })
    }

    pub fn variable(&self, name: &str) -> Option<&PxVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Cell at the given category index per variable
    pub fn cell(&self, coords: &[usize]) -> Option<f64> {
        if coords.len() != self.variables.len() {
            return None;
        }
        let mut index = 0;
        for (var, &c) in self.variables.iter().zip(coords) {
            if c >= var.values.len() {
                return None;
            }
            index = index * var.values.len() + c;
        }
        self.data.get(index).copied().flatten()
    }

    /// One value per region, every other dimension fixed by the selection
    pub fn select(&self, selection: &Selection) -> Result<Vec<ObservedValue>> {
        for (var, _) in &selection.filters {
            if self.variable(var).is_none() {
                return Err(Error::InvalidInput(format!(
                    "unknown PC-Axis variable '{}'",
                    var
                )));
            }
        }

        let region_pos = self
            .variables
            .iter()
            .position(|v| v.name == selection.region)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "unknown PC-Axis region variable '{}'",
                    selection.region
                ))
            })?;

        let mut coords = vec![0usize; self.variables.len()];
        for (i, var) in self.variables.iter().enumerate() {
            if i == region_pos {
                continue;
            }
            coords[i] = match selection.filter_for(&var.name) {
                Some(wanted) => var.position(wanted).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "variable '{}' has no value '{}'",
                        var.name, wanted
                    ))
                })?,
                None if var.values.len() == 1 => 0,
                None => {
                    return Err(Error::InvalidInput(format!(
                        "no value selected for variable '{}'",
                        var.name
                    )))
                }
            };
        }

        let regions = &self.variables[region_pos];
        let mut out = Vec::with_capacity(regions.values.len());
        for (r, name) in regions.values.iter().enumerate() {
            coords[region_pos] = r;
            out.push(ObservedValue::new(name, self.cell(&coords)));
        }
        Ok(out)
    }
}

/// Split the file into statements on `;` outside quoted strings
fn split_statements(text: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                let stmt = text[start..i].trim();
                if !stmt.is_empty() {
                    statements.push(stmt);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    statements
}

fn parse_statement(stmt: &str) -> Result<Statement<'_>> {
    let mut in_quotes = false;
    let mut eq = None;
    for (i, c) in stmt.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '=' if !in_quotes => {
                eq = Some(i);
                break;
            }
            _ => {}
        }
    }
    let eq = eq.ok_or_else(|| {
        let head: String = stmt.chars().take(40).collect();
        Error::PcAxis(format!("statement without '=': {}", head))
    })?;

    let key = stmt[..eq].trim();
    let value = stmt[eq + 1..].trim();

    let name_end = key.find(|c: char| c == '[' || c == '(').unwrap_or(key.len());
    let keyword = key[..name_end].trim();
    let rest = &key[name_end..];

    let lang = rest
        .strip_prefix('[')
        .and_then(|r| r.find(']').map(|end| &r[..end]));
    let subkey = match (rest.find('('), rest.rfind(')')) {
        (None, None) => None,
        (Some(open), Some(close)) if close > open => {
            parse_strings(&rest[open + 1..close]).into_iter().next()
        }
        _ => {
            return Err(Error::PcAxis(format!(
                "unbalanced parentheses in keyword '{}'",
                key
            )))
        }
    };

    Ok(Statement {
        keyword,
        lang,
        subkey,
        value,
    })
}

/// Comma-separated list of (usually quoted) strings. Quoted fragments not
/// separated by a comma are one string wrapped over several lines.
fn parse_strings(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut has_item = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                    current.push(q);
                }
                has_item = true;
            }
            ',' => {
                items.push(std::mem::take(&mut current));
                has_item = false;
            }
            c if c.is_whitespace() => {}
            c => {
                current.push(c);
                has_item = true;
            }
        }
    }
    if has_item {
        items.push(current);
    }
    items
}

/// Data cells; missing-value markers ("..", "-", ...) become None
fn parse_data(raw: &str) -> Vec<Option<f64>> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches('"').parse::<f64>().ok())
        .collect()
}

/// Decode PX bytes; files declared CHARSET="ANSI" are Windows-1252
pub fn decode_px(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// PC-Axis file reader
pub struct PcAxisReader {
    path: PathBuf,
}

impl PcAxisReader {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn load(&self) -> Result<PxTable> {
        let bytes = std::fs::read(&self.path)?;
        let table = PxTable::parse(&decode_px(bytes))?;
        debug!(
            file = %self.path.display(),
            title = table.title.as_deref().unwrap_or(""),
            cells = table.data.len(),
            "loaded PC-Axis table"
        );
        Ok(table)
    }
}

impl ObservedReader for PcAxisReader {
    fn read_observed(&mut self, selection: &Selection) -> Result<Vec<ObservedValue>> {
        self.load()?.select(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"CHARSET="ANSI";
AXIS-VERSION="2000";
LANGUAGE="es";
TITLE="Población por provincias y sexo";
STUB="Provincias","Sexo";
HEADING="Periodo";
VALUES("Provincias")="Total Nacional","08 Barcelona",
"12 Castellón/Castelló";
VALUES("Sexo")="Total","Hombres","Mujeres";
VALUES("Periodo")="2022","2021";
VALUES[en]("Provincias")="National total","08 Barcelona","12 Castellón";
DATA=
47615034 47385107
23305390 23222953
24309644 24162154
5714730 5727000
2797000 2803000
2917730 2924000
590000 ".."
291000 292000
299000 ".";
"#;

    #[test]
    fn test_parse_dimensions() {
        let table = PxTable::parse(SAMPLE).unwrap();
        assert_eq!(table.title.as_deref(), Some("Población por provincias y sexo"));
        let names: Vec<&str> = table.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Provincias", "Sexo", "Periodo"]);
        assert_eq!(
            table.variable("Provincias").unwrap().values,
            vec!["Total Nacional", "08 Barcelona", "12 Castellón/Castelló"]
        );
        assert_eq!(table.data.len(), 18);
    }

    #[test]
    fn test_cell_layout() {
        let table = PxTable::parse(SAMPLE).unwrap();
        // Barcelona, Mujeres, 2021
        assert_eq!(table.cell(&[1, 2, 1]), Some(2924000.0));
        // Castellón, Total, 2021 is missing
        assert_eq!(table.cell(&[2, 0, 1]), None);
        assert_eq!(table.cell(&[3, 0, 0]), None);
    }

    #[test]
    fn test_select_region_values() {
        let table = PxTable::parse(SAMPLE).unwrap();
        let selection = Selection::new("Provincias")
            .with_filter("Periodo", "2022")
            .with_filter("Sexo", "Total");
        let values = table.select(&selection).unwrap();
        assert_eq!(
            values,
            vec![
                ObservedValue::new("Total Nacional", Some(47615034.0)),
                ObservedValue::new("08 Barcelona", Some(5714730.0)),
                ObservedValue::new("12 Castellón/Castelló", Some(590000.0)),
            ]
        );
    }

    #[test]
    fn test_select_requires_every_dimension() {
        let table = PxTable::parse(SAMPLE).unwrap();
        let selection = Selection::new("Provincias").with_filter("Periodo", "2022");
        let err = table.select(&selection).unwrap_err();
        assert!(err.to_string().contains("'Sexo'"));
    }

    #[test]
    fn test_select_unknown_value() {
        let table = PxTable::parse(SAMPLE).unwrap();
        let selection = Selection::new("Provincias")
            .with_filter("Periodo", "1999")
            .with_filter("Sexo", "Total");
        assert!(matches!(table.select(&selection), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_cell_count_mismatch() {
        let text = r#"STUB="A";VALUES("A")="x","y";DATA=1 2 3;"#;
        assert!(matches!(PxTable::parse(text), Err(Error::PcAxis(_))));
    }

    #[test]
    fn test_missing_data() {
        let text = r#"STUB="A";VALUES("A")="x";"#;
        assert!(matches!(PxTable::parse(text), Err(Error::PcAxis(_))));
    }

    #[test]
    fn test_malformed_keyword_is_an_error() {
        let err = PxTable::parse("A[)](=1;DATA=1;").unwrap_err();
        assert!(matches!(err, Error::PcAxis(_)));

        let text = r#"STUB="A";VALUES("A"="x";DATA=1;"#;
        assert!(matches!(PxTable::parse(text), Err(Error::PcAxis(_))));
    }

    #[test]
    fn test_wrapped_string_concatenation() {
        assert_eq!(
            parse_strings("\"Santa Cruz \"\n\"de Tenerife\",\"Lugo\""),
            vec!["Santa Cruz de Tenerife", "Lugo"]
        );
    }

    #[test]
    fn test_latin1_file() {
        let mut file = NamedTempFile::with_suffix(".px").unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"STUB=\"Provincias\";\nVALUES(\"Provincias\")=\"12 Castell");
        bytes.push(0xF3);
        bytes.extend_from_slice(b"n\",\"15 Coru");
        bytes.push(0xF1);
        bytes.extend_from_slice(b"a, A\";\nDATA=\n590000 1120000;\n");
        file.write_all(&bytes).unwrap();

        let mut reader = PcAxisReader::new(file.path()).unwrap();
        let values = reader.read_observed(&Selection::new("Provincias")).unwrap();
        assert_eq!(values[0].name, "12 Castellón");
        assert_eq!(values[1].name, "15 Coruña, A");
        assert_eq!(values[1].value, Some(1120000.0));
    }
}
