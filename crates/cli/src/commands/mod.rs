//! CLI command handlers

pub mod history;
pub mod ledger;
pub mod run;

use anyhow::{Context, Result};
use std::path::Path;

/// Write to a file, or stdout when no path is given
pub(crate) fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("📄 Written to {:?}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}
