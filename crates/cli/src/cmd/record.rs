//! Commands that mutate the store

use anyhow::{Context, Result};
use date_store::DateStore;
use owo_colors::OwoColorize;
use std::process::ExitCode;

/// Record the current time for each key
pub fn set(store: &DateStore, keys: &[String]) -> Result<ExitCode> {
    for key in keys {
        store
            .record(key)
            .with_context(|| format!("Failed to record '{}'", key))?;

        let stamp = store.raw_value(key).unwrap_or_default();
        println!("{} {} → {}", "✓".green(), key.yellow(), stamp.dimmed());
    }
    Ok(ExitCode::SUCCESS)
}

/// Delete each key (missing keys are not an error)
pub fn delete(store: &DateStore, keys: &[String]) -> Result<ExitCode> {
    for key in keys {
        let existed = store.raw_value(key).is_some();
        store
            .delete(key)
            .with_context(|| format!("Failed to delete '{}'", key))?;

        if existed {
            println!("{} Deleted {}", "✓".green(), key.yellow());
        } else {
            println!("{} {} was not stored", "·".dimmed(), key.yellow());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Remove every key
pub fn clear(store: &DateStore) -> Result<ExitCode> {
    let count = store.len();
    store.clear().context("Failed to clear store")?;
    println!("{} Cleared {} entries", "✓".green(), count);
    Ok(ExitCode::SUCCESS)
}
