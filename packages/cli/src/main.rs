#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the SoF event extractor.
//!
//! ```text
//! sof_events_cli serve
//! sof_events_cli extract <path> [--format html|json|csv] [--output <file>] [--rules <toml>]
//! sof_events_cli cleanup [--max-age-hours 24]
//! ```
//!
//! Running with no subcommand enters interactive mode.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::{Input, Select};
use sof_events_extract::{Extractor, RuleSet};
use sof_events_intake::Staging;
use sof_events_server::ServerConfig;

#[derive(Parser)]
#[command(
    name = "sof_events_cli",
    about = "Extract Statement of Facts events from PDF, DOCX and text documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (configured from the environment)
    Serve,
    /// Extract events from a single document
    Extract {
        /// Document to process (PDF, DOCX or plain text)
        path: PathBuf,
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,
        /// Write the report to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Custom field rule table (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Remove staged files and reports past the retention window
    Cleanup {
        /// Maximum age in hours (defaults to `SOF_RETENTION_HOURS`)
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Html,
    Json,
    Csv,
}

impl OutputFormat {
    const ALL: &[Self] = &[Self::Html, Self::Json, Self::Csv];

    const fn label(self) -> &'static str {
        match self {
            Self::Html => "HTML report",
            Self::Json => "JSON",
            Self::Csv => "CSV",
        }
    }
}

/// Top-level tool selection for interactive mode.
enum Tool {
    Extract,
    Server,
    Cleanup,
}

impl Tool {
    const ALL: &[Self] = &[Self::Extract, Self::Server, Self::Cleanup];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Extract => "Extract events from a document",
            Self::Server => "Start server",
            Self::Cleanup => "Clean up expired files",
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive();
    };

    match command {
        Commands::Serve => serve()?,
        Commands::Extract {
            path,
            format,
            output,
            rules,
        } => extract(&path, format, output.as_deref(), rules.as_deref())?,
        Commands::Cleanup { max_age_hours } => cleanup(max_age_hours)?,
    }

    Ok(())
}

fn serve() -> std::io::Result<()> {
    actix_rt::System::new().block_on(sof_events_server::run_server(ServerConfig::from_env()))
}

/// Extracts one document and renders it in `format`.
fn render_document(
    path: &Path,
    format: OutputFormat,
    rules: Option<&Path>,
) -> Result<String, Box<dyn std::error::Error>> {
    let extractor = match rules {
        Some(rules) => Extractor::new(RuleSet::from_file(rules)?),
        None => Extractor::builtin(),
    };

    let document = sof_events_intake::extract_file(path)?;
    let extraction = extractor.extract(&document)?;

    Ok(match format {
        OutputFormat::Html => sof_events_report::render(&extraction, None),
        OutputFormat::Json => sof_events_report::to_json(&extraction, chrono::Utc::now())?,
        OutputFormat::Csv => {
            sof_events_report::to_csv(sof_events_report::export_rows(&extraction))?
        }
    })
}

fn extract(
    path: &Path,
    format: OutputFormat,
    output: Option<&Path>,
    rules: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = render_document(path, format, rules)?;

    match output {
        Some(output) => {
            std::fs::write(output, rendered)?;
            log::info!("Wrote {} to {}", format.label(), output.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

fn cleanup(max_age_hours: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env();
    let max_age = max_age_hours.map_or(config.retention, |hours| {
        Duration::from_secs(hours.saturating_mul(3600))
    });

    let removed = Staging::new(config.staging()).purge_expired(max_age)?;
    println!(
        "Removed {removed} expired file(s) under {}",
        config.data_dir.display()
    );
    Ok(())
}

fn interactive() -> Result<(), Box<dyn std::error::Error>> {
    println!("SoF Event Extractor");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Extract => {
            let path: String = Input::new().with_prompt("Document path").interact_text()?;

            let formats: Vec<&str> = OutputFormat::ALL.iter().map(|f| f.label()).collect();
            let format_idx = Select::new()
                .with_prompt("Report format")
                .items(&formats)
                .default(0)
                .interact()?;

            let output: String = Input::new()
                .with_prompt("Output file (empty for stdout)")
                .allow_empty(true)
                .interact_text()?;
            let output = output.trim();

            extract(
                Path::new(path.trim()),
                OutputFormat::ALL[format_idx],
                (!output.is_empty()).then(|| Path::new(output)),
                None,
            )?;
        }
        Tool::Server => {
            actix_rt::System::new().block_on(sof_events_server::interactive::run())?;
        }
        Tool::Cleanup => {
            let default_hours = ServerConfig::from_env().retention.as_secs() / 3600;
            let hours: u64 = Input::new()
                .with_prompt("Remove files older than (hours)")
                .default(default_hours)
                .interact_text()?;
            cleanup(Some(hours))?;
        }
    }

    Ok(())
}
