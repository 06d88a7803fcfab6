//! Schema command: print or write the active field schema.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    /// Write the schema JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: SchemaArgs, schema_path: Option<&Path>) -> anyhow::Result<()> {
    let schema = super::load_schema(schema_path)?;

    match args.output {
        Some(path) => {
            schema
                .save(&path)
                .map_err(|e| anyhow::anyhow!("Failed to write schema: {}", e))?;
            println!("{} Schema written to {}", style("✓").green(), path.display());
        }
        None => {
            println!("{}", serde_json::to_string_pretty(schema.fields())?);
        }
    }

    Ok(())
}
