//! Command handler modules for vnq-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod quote;

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde_json::Value;
use vnq_config::{LoadedConfig, UnusedKeyPolicy};
use vnq_md::Table;

use crate::OutputFormat;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config; no paths means every setting takes its default.
/// Unused keys are reported, never fatal.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let loaded = if paths.is_empty() {
        LoadedConfig::empty()?
    } else {
        let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        vnq_config::load_layered_yaml(&path_refs)?
    };

    let report = vnq_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &report.unused_leaf_pointers {
        eprintln!("WARN: unused config key {pointer}");
    }
    Ok(loaded)
}

/// `RUST_LOG` wins; otherwise `--show-log` means info, then `/logging/level`,
/// then warn.
pub fn init_tracing(config_json: &Value, show_log: bool) {
    let fallback = if show_log {
        "info".to_string()
    } else {
        config_json
            .pointer("/logging/level")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "warn".to_string())
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .init();
}

/// Print a table to stdout in the requested format.
pub fn emit_table(table: &Table, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Csv => table.write_csv(&mut out).context("write csv failed")?,
        OutputFormat::Json => {
            let s = serde_json::to_string_pretty(&table.to_json())
                .context("serialize table failed")?;
            writeln!(out, "{s}").context("write stdout failed")?;
        }
    }
    Ok(())
}
