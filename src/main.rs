mod aliases;
mod cli;
mod config;
mod error;
mod join;
mod logging;
mod output;
mod readers;
mod reconcile;
mod report;
mod strip;
mod types;

use clap::Parser;
use cli::{build_request, Cli, Commands, RequestOverrides};
use error::Error;
use tracing::debug;
use types::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Reconcile {
            canonical,
            observed,
            config,
            name_field,
            region,
            filters,
            out,
            no_hash,
            strict,
        } => {
            let overrides = RequestOverrides {
                config,
                name_field,
                region,
                filters,
                hash_files: !no_hash,
            };
            let request = build_request(canonical, observed, overrides)?;
            let report = report::run(&request)?;

            if let Some(out_path) = out {
                output::write_json_file(&report, &out_path)?;
                eprintln!("Report written to: {}", out_path.display());
            } else {
                output::write_json_stdout(&report)?;
            }

            if strict && report.unresolved_count() > 0 {
                return Err(Error::InvalidInput(format!(
                    "{} region name(s) unresolved",
                    report.unresolved_count()
                )));
            }
        }
        Commands::Match { canonical, names } => {
            let reconciliation = reconcile::reconcile(&canonical, &names)?;
            if reconciliation.mapping.is_empty() {
                debug!("no observed name resolved");
            }
            for name in &names {
                let stripped = strip::strip_code(name);
                match reconciliation.mapping.get_match(stripped) {
                    Some(m) => println!("{}\t{}\t{:?}", name, m.canonical, m.kind),
                    None => println!("{}\t-\tunresolved", name),
                }
            }

            let unresolved = reconciliation.unresolved_names();
            if !unresolved.is_empty() {
                eprintln!(
                    "Unresolved: {}",
                    unresolved.into_iter().collect::<Vec<_>>().join(", ")
                );
            }
        }
        Commands::Strip { names } => {
            for name in &names {
                if !strip::has_code(name) {
                    debug!(name = %name, "no code prefix");
                }
                println!("{}", strip::strip_code(name));
            }
        }
    }

    Ok(())
}
