//! CLI command implementations.

use std::path::Path;

use receval_core::Schema;

pub mod evaluate;
pub mod extract;
pub mod schema;

/// Load a schema from a file, or fall back to the built-in receipt schema.
pub fn load_schema(path: Option<&Path>) -> anyhow::Result<Schema> {
    match path {
        Some(path) => Schema::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load schema from {}: {}", path.display(), e)),
        None => Ok(Schema::receipt()),
    }
}
