use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ReconConfig;
use crate::error::Error;
use crate::reconcile::Reconciler;
use crate::report::ReconRequest;
use crate::types::Result;

/// Match statistics-office region names to boundary-layer region names
#[derive(Parser, Debug)]
#[command(name = "region-recon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug detail (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile region names and join the statistics onto the boundary regions
    Reconcile {
        /// Boundary attribute table (CSV/TSV) with one row per polygon
        #[arg(short, long)]
        canonical: PathBuf,

        /// Statistics file (PC-Axis .px or long-format CSV/TSV)
        #[arg(short = 's', long)]
        observed: PathBuf,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Attribute column holding the region name
        #[arg(long)]
        name_field: Option<String>,

        /// Variable or column holding the region name in the statistics file
        #[arg(long)]
        region: Option<String>,

        /// Fix a dimension to one category, e.g. --filter Periodo=2022
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Output JSON file path (stdout if not specified)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip the SHA-256 of the input files in the report
        #[arg(long, default_value_t = false)]
        no_hash: bool,

        /// Exit with an error when any region name stays unresolved
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Reconcile names given on the command line, using the built-in aliases
    Match {
        /// Canonical region name (repeat for each region)
        #[arg(short, long = "canonical", required = true)]
        canonical: Vec<String>,

        /// Observed names such as "12 Castell"
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print names with their leading administrative code removed
    Strip {
        /// Names such as "08 Barcelona"
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// Parse `VARIABLE=VALUE`
fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    let (var, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected VARIABLE=VALUE, got '{}'", raw))?;
    if var.trim().is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }
    Ok((var.trim().to_string(), value.trim().to_string()))
}

/// Settings from the reconcile subcommand that shape the request
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub config: Option<PathBuf>,
    pub name_field: Option<String>,
    pub region: Option<String>,
    pub filters: Vec<(String, String)>,
    pub hash_files: bool,
}

/// Merge the config file (if any) with command-line overrides
pub fn build_request(
    canonical: PathBuf,
    observed: PathBuf,
    overrides: RequestOverrides,
) -> Result<ReconRequest> {
    let config = match &overrides.config {
        Some(path) => ReconConfig::load(path)?,
        None => ReconConfig::default(),
    };

    let mut selection = config.selection();
    if let Some(region) = overrides.region {
        selection.region = region;
    }
    for (var, value) in overrides.filters {
        selection.filters.retain(|(v, _)| *v != var);
        selection = selection.with_filter(&var, &value);
    }
    if selection.filter_for(&selection.region).is_some() {
        return Err(Error::InvalidInput(format!(
            "cannot filter on the region variable '{}'",
            selection.region
        )));
    }

    Ok(ReconRequest {
        canonical_path: canonical,
        name_field: overrides
            .name_field
            .unwrap_or_else(|| config.canonical.field.clone()),
        observed_path: observed,
        selection,
        reconciler: Reconciler::new(config.alias_table()),
        hash_files: overrides.hash_files,
    })
}
