use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Default attribute field holding the region name in the geometry table
pub const DEFAULT_NAME_FIELD: &str = "NAMEUNIT";

/// Default column/variable holding the region name in the statistics source
pub const DEFAULT_REGION_VARIABLE: &str = "Provincias";

/// How an observed name was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Stripped name equals a canonical name
    Exact,
    /// Resolved through the override list
    Alias,
    /// Single substring candidate among unclaimed canonical names
    Fuzzy,
}

/// Canonical target of a resolved observed name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedName {
    pub canonical: String,
    pub kind: MatchKind,
}

/// Why an observed name could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Nothing left to strip against
    Empty,
    /// No canonical name matched
    NoCandidate,
    /// More than one canonical name matched
    Ambiguous { candidates: Vec<String> },
}

/// An observed name left out of the mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unresolved {
    pub name: String,
    #[serde(flatten)]
    pub reason: UnresolvedReason,
}

impl Unresolved {
    pub fn new(name: &str, reason: UnresolvedReason) -> Self {
        Self {
            name: name.to_string(),
            reason,
        }
    }
}

/// Mapping from stripped observed name to canonical name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameMapping {
    entries: BTreeMap<String, MatchedName>,
}

impl NameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, observed: &str, canonical: &str, kind: MatchKind) {
        self.entries.insert(
            observed.to_string(),
            MatchedName {
                canonical: canonical.to_string(),
                kind,
            },
        );
    }

    /// Canonical name for a stripped observed name
    pub fn get(&self, observed: &str) -> Option<&str> {
        self.entries.get(observed).map(|m| m.canonical.as_str())
    }

    pub fn get_match(&self, observed: &str) -> Option<&MatchedName> {
        self.entries.get(observed)
    }

    pub fn contains_key(&self, observed: &str) -> bool {
        self.entries.contains_key(observed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MatchedName)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries resolved by the given pass
    pub fn count_kind(&self, kind: MatchKind) -> usize {
        self.entries.values().filter(|m| m.kind == kind).count()
    }
}

/// A region value read from the statistics source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedValue {
    /// Region name as written in the source, code prefix included
    pub name: String,
    pub value: Option<f64>,
}

impl ObservedValue {
    pub fn new(name: &str, value: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// Which slice of the statistics source to read
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Variable (PX) or column (CSV) holding the region name
    pub region: String,

    /// Fixed values for the other dimensions, e.g. ("Periodo", "2022")
    pub filters: Vec<(String, String)>,

    /// Value column for long-format CSV input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
}

impl Selection {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            filters: Vec::new(),
            value_column: None,
        }
    }

    pub fn with_filter(mut self, variable: &str, value: &str) -> Self {
        self.filters.push((variable.to_string(), value.to_string()));
        self
    }

    pub fn filter_for(&self, variable: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(v, _)| v == variable)
            .map(|(_, value)| value.as_str())
    }
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Tsv,
    PcAxis,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "tsv" | "tab" => Some(FileFormat::Tsv),
            "px" => Some(FileFormat::PcAxis),
            _ => None,
        }
    }
}

/// Result type for the application
pub type Result<T> = std::result::Result<T, crate::error::Error>;
