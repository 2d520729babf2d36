//! Dump the store

use anyhow::{Context, Result};
use date_store::DateStore;
use std::process::ExitCode;

/// Print the store as JSON, using the configured indent
pub fn json(store: &DateStore) -> Result<ExitCode> {
    let text = store.serialize(None).context("Failed to serialize store")?;
    println!("{}", text);
    Ok(ExitCode::SUCCESS)
}

/// Print the backing file location
pub fn path(store: &DateStore) -> Result<ExitCode> {
    println!("{}", store.path().display());
    Ok(ExitCode::SUCCESS)
}
