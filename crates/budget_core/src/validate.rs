use anyhow::{bail, Result};
use std::path::PathBuf;

/// Eager usage validation, run before any file is opened for parsing.
pub fn ensure_input_files(paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        bail!("at least one file_name is required");
    }
    for path in paths {
        if !path.is_file() {
            bail!("not a file '{}'", path.display());
        }
    }
    Ok(())
}

pub fn ensure_supported_currency(currency: &str, supported: &[&str]) -> Result<()> {
    if !supported.contains(&currency) {
        bail!(
            "not supported currency '{}', supported list: {}",
            currency,
            supported.join(", ")
        );
    }
    Ok(())
}
