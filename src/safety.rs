//! Safety utilities to prevent clobbering the source catalog.
//!
//! The generated dataset and the catalog are both CSV files, so a mistyped
//! output path can silently overwrite the input.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output filename must end with the required extension (e.g., "csv")
/// - Output cannot be the same as any of the provided source paths
pub fn validate_output_path(output: &Path, required_extension: &str, source_paths: &[&Path]) -> Result<()> {
    let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extension.eq_ignore_ascii_case(required_extension) {
        bail!(
            "Safety check failed: output file '{}' must have a .{} extension",
            output.display(),
            required_extension
        );
    }

    for source in source_paths {
        if same_file(output, source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

/// Compare canonical paths when both exist, raw paths otherwise.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
