use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::aliases::{Alias, AliasTable};
use crate::error::Error;
use crate::types::{Result, Selection, DEFAULT_NAME_FIELD, DEFAULT_REGION_VARIABLE};

/// Run configuration, usually read from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub canonical: CanonicalConfig,
    #[serde(default)]
    pub observed: ObservedConfig,
    #[serde(default)]
    pub aliases: AliasConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalConfig {
    /// Attribute column holding the region name
    #[serde(default = "default_name_field")]
    pub field: String,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            field: default_name_field(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservedConfig {
    #[serde(default = "default_region_variable")]
    pub region: String,

    /// Value column, long-format CSV only
    #[serde(default)]
    pub value_column: Option<String>,

    /// Fixed category per remaining dimension (time period, sex, ...)
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl Default for ObservedConfig {
    fn default() -> Self {
        Self {
            region: default_region_variable(),
            value_column: None,
            filters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasConfig {
    /// Drop the built-in Spanish province variants
    #[serde(default)]
    pub replace_defaults: bool,
    #[serde(default)]
    pub entries: Vec<Alias>,
}

fn default_name_field() -> String {
    DEFAULT_NAME_FIELD.to_string()
}

fn default_region_variable() -> String {
    DEFAULT_REGION_VARIABLE.to_string()
}

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: ReconConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.canonical.field.trim().is_empty() {
            return Err(Error::Config("canonical.field must not be empty".into()));
        }
        if self.observed.region.trim().is_empty() {
            return Err(Error::Config("observed.region must not be empty".into()));
        }
        if self.observed.filters.contains_key(&self.observed.region) {
            return Err(Error::Config(format!(
                "observed.filters must not fix the region variable '{}'",
                self.observed.region
            )));
        }

        let mut seen = HashSet::new();
        for alias in &self.aliases.entries {
            if alias.observed.is_empty() || alias.canonical.is_empty() {
                return Err(Error::Config("alias entries need observed and canonical names".into()));
            }
            if !seen.insert(alias.observed.as_str()) {
                return Err(Error::Config(format!(
                    "alias for '{}' listed twice",
                    alias.observed
                )));
            }
        }

        Ok(())
    }

    /// Override list: built-in defaults (unless replaced) plus configured entries
    pub fn alias_table(&self) -> AliasTable {
        let mut table = if self.aliases.replace_defaults {
            AliasTable::new()
        } else {
            AliasTable::spanish_provinces()
        };
        table.extend(self.aliases.entries.iter().cloned());
        table
    }

    pub fn selection(&self) -> Selection {
        Selection {
            region: self.observed.region.clone(),
            filters: self
                .observed
                .filters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            value_column: self.observed.value_column.clone(),
        }
    }
}
