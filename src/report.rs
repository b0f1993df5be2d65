use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::join::{attach_values, RegionValue};
use crate::reconcile::{CanonicalNameSet, Reconciler};
use crate::readers::{create_observed_reader, read_canonical_names};
use crate::types::{MatchKind, ObservedValue, Result, Selection, Unresolved, REPORT_VERSION};

/// What to reconcile and how
#[derive(Debug, Clone)]
pub struct ReconRequest {
    pub canonical_path: PathBuf,
    pub name_field: String,
    pub observed_path: PathBuf,
    pub selection: Selection,
    pub reconciler: Reconciler,
    pub hash_files: bool,
}

/// One resolved name in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub observed: String,
    pub canonical: String,
    pub kind: MatchKind,
}

/// Input file description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFile {
    pub file_name: String,

    /// SHA-256 of the file contents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Complete reconciliation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconReport {
    pub version: String,
    pub canonical: InputFile,
    pub observed: InputFile,
    pub selection: Selection,
    pub matched: Vec<MatchEntry>,
    pub unresolved: Vec<Unresolved>,
    pub regions: Vec<RegionValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<ObservedValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ReconReport {
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }
}

fn describe(path: &Path, hash: bool) -> Result<InputFile> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    let sha256 = if hash {
        Some(compute_file_hash(path)?)
    } else {
        None
    };
    Ok(InputFile { file_name, sha256 })
}

/// Read both sources, reconcile their region names and join the values
pub fn run(request: &ReconRequest) -> Result<ReconReport> {
    let canonical_names = read_canonical_names(&request.canonical_path, &request.name_field)?;
    let canonical = CanonicalNameSet::new(canonical_names)?;

    let mut reader = create_observed_reader(&request.observed_path)?;
    let observed = reader.read_observed(&request.selection)?;
    info!(
        canonical = canonical.len(),
        observed = observed.len(),
        "loaded region names"
    );

    let aliases = request.reconciler.aliases();
    if aliases.is_empty() {
        debug!("no alias overrides configured");
    } else {
        debug!(aliases = aliases.len(), "alias overrides configured");
    }

    let names: Vec<&str> = observed.iter().map(|o| o.name.as_str()).collect();
    let reconciliation = request.reconciler.reconcile(&canonical, &names);
    let joined = attach_values(&canonical, &reconciliation, &observed);
    info!(
        mapped = reconciliation.mapping.len(),
        filled = joined.filled(),
        complete = reconciliation.is_complete(),
        "joined values onto regions"
    );

    let mut warnings = Vec::new();
    for u in &reconciliation.unresolved {
        warn!(observed = %u.name, "region name not resolved");
        warnings.push(format!("Unresolved region name '{}'", u.name));
    }
    for alias in &reconciliation.skipped_aliases {
        warnings.push(format!(
            "Alias '{}' -> '{}' skipped: target absent or already matched",
            alias.observed, alias.canonical
        ));
    }

    let matched = reconciliation
        .mapping
        .iter()
        .map(|(observed, m)| MatchEntry {
            observed: observed.to_string(),
            canonical: m.canonical.clone(),
            kind: m.kind,
        })
        .collect();

    Ok(ReconReport {
        version: REPORT_VERSION.to_string(),
        canonical: describe(&request.canonical_path, request.hash_files)?,
        observed: describe(&request.observed_path, request.hash_files)?,
        selection: request.selection.clone(),
        matched,
        unresolved: reconciliation.unresolved,
        regions: joined.regions,
        dropped: joined.dropped,
        warnings,
    })
}

/// Compute SHA-256 hash of a file (streaming to handle large files)
fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_inputs() -> (NamedTempFile, NamedTempFile) {
        let mut shapes = NamedTempFile::with_suffix(".csv").unwrap();
        write!(
            shapes,
            "NAMEUNIT,CODNUT3\nBarcelona,ES511\nCastellón/Castelló,ES522\nA Coruña,ES111\nGirona,ES512\n"
        )
        .unwrap();

        let mut stats = NamedTempFile::with_suffix(".px").unwrap();
        write!(
            stats,
            "STUB=\"Provincias\";\nHEADING=\"Periodo\";\n\
             VALUES(\"Provincias\")=\"08 Barcelona\",\"12 Castell\",\"15 Coruña, A\",\"35 Palmas, Las\";\n\
             VALUES(\"Periodo\")=\"2022\",\"2021\";\n\
             DATA=\n5714730 5727000\n590000 587000\n1120000 1119000\n1128000 1131000;\n"
        )
        .unwrap();
        (shapes, stats)
    }

    fn request(shapes: &Path, stats: &Path) -> ReconRequest {
        ReconRequest {
            canonical_path: shapes.to_path_buf(),
            name_field: "NAMEUNIT".to_string(),
            observed_path: stats.to_path_buf(),
            selection: Selection::new("Provincias").with_filter("Periodo", "2022"),
            reconciler: Reconciler::default(),
            hash_files: true,
        }
    }

    #[test]
    fn test_compute_file_hash() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "test content").unwrap();

        let hash = compute_file_hash(file.path()).unwrap();
        assert_eq!(hash.len(), 64); // SHA-256 produces 64 hex chars
    }

    #[test]
    fn test_run_end_to_end() {
        let (shapes, stats) = write_inputs();
        let report = run(&request(shapes.path(), stats.path())).unwrap();

        assert_eq!(report.matched.len(), 3);
        assert!(report.matched.iter().any(|m| m.observed == "Coruña, A"
            && m.canonical == "A Coruña"
            && m.kind == MatchKind::Alias));
        assert_eq!(report.unresolved_count(), 1);
        assert_eq!(report.unresolved[0].name, "Palmas, Las");
        assert_eq!(report.dropped.len(), 1);

        let girona = report.regions.iter().find(|r| r.canonical == "Girona").unwrap();
        assert_eq!(girona.value, None);
        let castellon = report
            .regions
            .iter()
            .find(|r| r.canonical == "Castellón/Castelló")
            .unwrap();
        assert_eq!(castellon.value, Some(590000.0));

        assert!(report.canonical.sha256.is_some());
        // unresolved "Palmas, Las" plus its alias whose target is not in the layer
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_run_rejects_duplicate_geometry_names() {
        let (_, stats) = write_inputs();
        let mut shapes = NamedTempFile::with_suffix(".csv").unwrap();
        write!(shapes, "NAMEUNIT\nBarcelona\nBarcelona\n").unwrap();

        let err = run(&request(shapes.path(), stats.path())).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_run_without_hashes() {
        let (shapes, stats) = write_inputs();
        let mut req = request(shapes.path(), stats.path());
        req.hash_files = false;

        let report = run(&req).unwrap();
        assert!(report.observed.sha256.is_none());
        assert!(report.observed.file_name.ends_with(".px"));
    }
}
