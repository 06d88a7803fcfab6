//! CLI application for receipt extraction evaluation.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{evaluate, extract, schema};

/// Receipt extraction evaluation - score model output against ground truth
#[derive(Parser)]
#[command(name = "receval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a field schema JSON file (defaults to the built-in receipt schema)
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a directory of model outputs against ground truth
    Evaluate(evaluate::EvaluateArgs),

    /// Extract and normalize a single model output file
    Extract(extract::ExtractArgs),

    /// Print or write the field schema
    Schema(schema::SchemaArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Evaluate(args) => evaluate::run(args, cli.schema.as_deref()).await,
        Commands::Extract(args) => extract::run(args, cli.schema.as_deref()),
        Commands::Schema(args) => schema::run(args, cli.schema.as_deref()),
    }
}
