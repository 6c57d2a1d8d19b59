//! Path, catalog and output helpers

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::metadata::SchemaCatalog;

/// Canonicalize and validate a path
pub fn canonicalize_path(path: &str) -> Result<String> {
    let path = Path::new(path)
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", path))?;
    Ok(path.display().to_string())
}

/// Load the schema catalog, failing when it names no objects
pub fn load_catalog(metadata_path: &Path) -> Result<SchemaCatalog> {
    let catalog = SchemaCatalog::load(metadata_path)
        .with_context(|| format!("Could not load metadata from {}", metadata_path.display()))?;
    if catalog.is_empty() {
        anyhow::bail!(
            "No schema objects found in {}",
            metadata_path.display()
        );
    }
    Ok(catalog)
}

/// Write to a file, or print to stdout when no path is given
pub fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote report to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
