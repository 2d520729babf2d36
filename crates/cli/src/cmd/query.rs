//! Read-only lookups against the store

use crate::util;
use anyhow::{bail, Result};
use date_store::DateStore;
use owo_colors::OwoColorize;
use std::process::ExitCode;

/// Show the stored date for a key with its age
pub fn get(store: &DateStore, key: &str) -> Result<ExitCode> {
    let Some(instant) = store.lookup(key) else {
        eprintln!("{} No valid date stored for '{}'", "✗".red(), key);
        return Ok(ExitCode::FAILURE);
    };

    let now_ms = chrono::Local::now().timestamp_millis();
    println!(
        "{}  {}",
        util::format_absolute_time(instant),
        util::format_relative_time(instant.timestamp_millis(), now_ms).dimmed()
    );
    Ok(ExitCode::SUCCESS)
}

/// Print the stored string exactly as persisted
pub fn raw(store: &DateStore, key: &str) -> Result<ExitCode> {
    match store.raw_value(key) {
        Some(value) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}

pub fn has(store: &DateStore, key: &str) -> Result<ExitCode> {
    let present = store.has(key);
    println!("{}", present);
    Ok(if present {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Seconds between the stored date and the expression (positive = stored is later)
pub fn diff(store: &DateStore, key: &str, expr: &str) -> Result<ExitCode> {
    if store.resolve_expression(expr).is_none() {
        bail!("Could not understand time expression '{}'", expr);
    }

    match store.difference_seconds(key, expr) {
        Some(seconds) => {
            println!("{}", seconds);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("{} No valid date stored for '{}'", "✗".red(), key);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// List keys recorded after the expression, in insertion order
pub fn since(store: &DateStore, expr: &str) -> Result<ExitCode> {
    if store.resolve_expression(expr).is_none() {
        bail!("Could not understand time expression '{}'", expr);
    }

    for key in store.entries_since(expr) {
        println!("{}", key);
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolve an expression without touching stored data
pub fn date(store: &DateStore, expr: &str) -> Result<ExitCode> {
    let Some(instant) = store.resolve_expression(expr) else {
        bail!("Could not understand time expression '{}'", expr);
    };

    println!("{}", util::format_absolute_time(instant));
    println!("{}", instant.timestamp_millis().to_string().dimmed());
    Ok(ExitCode::SUCCESS)
}
