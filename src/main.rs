use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod classify;
mod config;
mod error;
mod fields;
mod ingest;
mod models;
mod observations;
mod report;
mod risk;
mod tracker;

use config::Settings;
use ingest::Source;

#[derive(Parser)]
#[command(name = "fellowship-insights")]
#[command(about = "Attendance and classroom observation risk analysis for fellows", long_about = None)]
struct Cli {
    /// JSON settings file overriding column layout, vocabularies and thresholds
    #[arg(long, global = true, env = "FELLOWSHIP_INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the monthly attendance tracker
    Tracker(RunArgs),
    /// Analyze the classroom observation log
    Observations(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Input file (.csv or .json)
    #[arg(long)]
    input: PathBuf,
    #[arg(long, value_enum, default_value_t = Format::Markdown)]
    format: Format,
    /// Write here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
    /// Fellows listed per report section
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fellowship_insights=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;

    let (args, output) = match cli.command {
        Commands::Tracker(args) => {
            let table = ingest::read_table(&args.input, Source::Tracker, &settings.tracker.sheet)
                .with_context(|| format!("failed to read {}", args.input.display()))?;
            let analysis = tracker::analyze(&table, &settings)
                .with_context(|| format!("failed to analyze {}", args.input.display()))?;
            let output = match args.format {
                Format::Markdown => report::tracker_report(&analysis, args.limit, chrono::Utc::now()),
                Format::Json => serde_json::to_string_pretty(&analysis)?,
            };
            (args, output)
        }
        Commands::Observations(args) => {
            let table = ingest::read_table(&args.input, Source::Observations, &settings.tracker.sheet)
                .with_context(|| format!("failed to read {}", args.input.display()))?;
            let analysis = observations::analyze(&table, &settings)
                .with_context(|| format!("failed to analyze {}", args.input.display()))?;
            let output = match args.format {
                Format::Markdown => {
                    report::observation_report(&analysis, args.limit, chrono::Utc::now())
                }
                Format::Json => serde_json::to_string_pretty(&analysis)?,
            };
            (args, output)
        }
    };

    match &args.out {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
