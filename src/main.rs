use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use materials_tools::batch;
use materials_tools::config::Settings;
use materials_tools::model::ReportType;
use materials_tools::pipeline;
use materials_tools::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Aggregate(args) => execute_aggregate(args),
        Command::Collect(args) => execute_collect(args),
    }
}

fn execute_aggregate(args: AggregateArgs) -> Result<()> {
    let settings = Settings::resolve(args.dir)?;
    let input = settings.resolve_input(&args.file);
    let output_dir = args.output_dir.unwrap_or_else(|| settings.directory.clone());

    let report = args.report.map(ReportType::from);
    let written = pipeline::aggregate_file(&input, &output_dir, report)?;
    println!("File saved successfully: {}", written.display());
    Ok(())
}

fn execute_collect(args: CollectArgs) -> Result<()> {
    let settings = Settings::resolve(args.dir)?;
    if args.rename_legacy {
        for renamed in batch::normalize_legacy_names(&settings.directory)? {
            println!("renamed legacy export to {}", renamed.display());
        }
    }

    let collected = batch::collect_batch(&settings.directory, Local::now().date_naive())?;
    let summary = collected.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for entry in &summary {
            println!(
                "{:<18} {:>6} rows  {}",
                entry.category.to_string(),
                entry.rows,
                entry.file
            );
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Deduplicate and aggregate daily materials-management exports."
)]
struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate a production or bin count export into a sorted report.
    Aggregate(AggregateArgs),
    /// Collect today's seven exports and report what was found.
    Collect(CollectArgs),
}

#[derive(clap::Args)]
struct AggregateArgs {
    /// Export file, relative to the working directory unless absolute.
    file: PathBuf,

    /// Working directory. Defaults to the user's download directory.
    #[arg(long, env = "MATERIALS_DIR")]
    dir: Option<PathBuf>,

    /// Report type. Detected from the export's columns when omitted.
    #[arg(long, value_enum)]
    report: Option<ReportKind>,

    /// Directory the sorted report is written to. Defaults to the working directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CollectArgs {
    /// Working directory. Defaults to the user's download directory.
    #[arg(long, env = "MATERIALS_DIR")]
    dir: Option<PathBuf>,

    /// Rename legacy `ci_reorder` min/max exports to `min_max` before collecting.
    #[arg(long)]
    rename_legacy: bool,

    /// Print the batch summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ReportKind {
    Production,
    BinCount,
}

impl From<ReportKind> for ReportType {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Production => ReportType::Production,
            ReportKind::BinCount => ReportType::BinCount,
        }
    }
}
