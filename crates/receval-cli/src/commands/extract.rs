//! Extract command: recover and normalize a single model output file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use receval_core::{ExtractionStatus, Pipeline};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Model output text file
    #[arg(required = true)]
    input: PathBuf,

    /// Write the processed sample JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run cross-field consistency checks
    #[arg(long)]
    validate: bool,
}

pub fn run(args: ExtractArgs, schema_path: Option<&Path>) -> anyhow::Result<()> {
    let schema = super::load_schema(schema_path)?;
    let pipeline = Pipeline::new(schema).with_validation(args.validate);

    let raw_text = fs::read_to_string(&args.input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.input.display(), e))?;

    let sample = pipeline.process(&raw_text);

    let glyph = match sample.status {
        ExtractionStatus::Parsed => style("✓").green(),
        ExtractionStatus::PartialPattern => style("~").yellow(),
        ExtractionStatus::ParseFailed => style("✗").red(),
    };
    eprintln!(
        "{} {} ({}, {} fields)",
        glyph,
        args.input.display(),
        sample.status,
        sample.record.len()
    );

    for warning in &sample.normalization.warnings {
        eprintln!("  {} {}", style("!").yellow(), warning);
    }
    if let Some(validation) = &sample.validation {
        for check in validation.warnings() {
            eprintln!("  {} {}: {}", style("!").yellow(), check.rule, check.detail);
        }
    }

    let json = serde_json::to_string_pretty(&sample)?;
    match args.output {
        Some(path) => {
            fs::write(&path, json)?;
            eprintln!("  Wrote {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
