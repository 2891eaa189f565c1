use clap::Parser;
use colored::*;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod errors;
mod models;
mod report;

use crate::config::settings::{Overrides, Settings, SortOrder};

#[derive(Parser)]
#[command(name = "release-tickets")]
#[command(version)]
#[command(about = "List the Jira tickets scheduled for a release", long_about = None)]
struct Cli {
    /// Config file (default: ~/.release-tickets/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project key (e.g., VSFT)
    #[arg(short, long)]
    project: Option<String>,

    /// Fix version to report on (e.g., 1.38.1)
    #[arg(short, long)]
    fix_version: Option<String>,

    /// Maximum number of tickets to fetch (default: 100)
    #[arg(long)]
    max_results: Option<u32>,

    /// Order by creation time
    #[arg(long, value_enum)]
    order: Option<SortOrder>,

    /// Output as JSON for scripting
    #[arg(long)]
    json: bool,

    /// for debugging purposes
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let result = match load_settings(&cli) {
        Ok(settings) => run(&settings, format, &mut std::io::stdout()).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗ Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "release_tickets=debug"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Settings from file and environment, with CLI flags taking precedence.
fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let overrides = Overrides {
        project_key: cli.project.clone(),
        fix_version: cli.fix_version.clone(),
        max_results: cli.max_results,
        order: cli.order,
    };

    Settings::load(cli.config.as_deref(), &overrides)
}

/// Fetches the release and writes it to `out`. Nothing is written unless the
/// search succeeds.
async fn run(settings: &Settings, format: OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    settings.validate()?;

    let jira = api::jira::JiraClient::new(
        settings.jira.url.clone(),
        settings.jira.email.clone(),
        settings.jira.api_token.clone(),
        settings.timeout(),
    )?;

    let release = report::fetch(&jira, settings).await?;

    if release.truncated() {
        tracing::warn!(shown = release.tickets.len(), "result set truncated");
        eprintln!(
            "{}",
            format!(
                "Showing the first {} matching issues; Jira has more. Raise --max-results to see more.",
                release.tickets.len()
            )
            .yellow()
        );
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&release.tickets)?;
            writeln!(out, "{}", json)?;
        }
        OutputFormat::Text => {
            let text = report::render(
                &release.fix_version,
                &release.tickets,
                &settings.custom_fields,
            );
            write!(out, "{}", text)?;
        }
    }

    Ok(())
}
