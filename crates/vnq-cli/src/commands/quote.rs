//! history / intraday / price-depth command handlers.

use anyhow::{Context, Result};
use tracing::info;
use vnq_config::LoadedConfig;
use vnq_md::{HistoryQuery, IntradayQuery, Quote, QuoteSettings};

use super::emit_table;
use crate::OutputFormat;

pub struct HistoryArgs {
    pub symbol: String,
    pub start: String,
    pub end: Option<String>,
    pub interval: String,
    pub count_back: Option<u32>,
    pub floating: u32,
    pub show_log: bool,
}

pub struct IntradayArgs {
    pub symbol: String,
    pub page_size: u32,
    pub last_time: Option<String>,
    pub show_log: bool,
}

fn open_quote(loaded: &LoadedConfig, symbol: &str) -> Result<Quote> {
    let settings = QuoteSettings::from_config_json(&loaded.config_json)
        .context("invalid quote settings")?;
    let quote = Quote::builder(symbol)
        .settings(settings)
        .build()
        .with_context(|| format!("cannot open quotes for '{symbol}'"))?;
    info!(config_hash = %loaded.config_hash, quote = ?quote, "quote adapter opened");
    Ok(quote)
}

pub fn run_history(loaded: &LoadedConfig, args: HistoryArgs, format: OutputFormat) -> Result<()> {
    let quote = open_quote(loaded, &args.symbol)?;

    let mut q = HistoryQuery::new(args.start)
        .interval(args.interval)
        .floating(args.floating)
        .show_log(args.show_log);
    if let Some(end) = args.end {
        q = q.end(end);
    }
    if let Some(n) = args.count_back {
        q = q.count_back(n);
    }

    let table = quote
        .history(&q)
        .with_context(|| format!("history failed for {}", quote.symbol()))?;
    emit_table(&table, format)
}

pub fn run_intraday(loaded: &LoadedConfig, args: IntradayArgs, format: OutputFormat) -> Result<()> {
    let quote = open_quote(loaded, &args.symbol)?;

    let mut q = IntradayQuery::new()
        .page_size(args.page_size)
        .show_log(args.show_log);
    if let Some(t) = args.last_time {
        q = q.last_time(t);
    }

    let table = quote
        .intraday(&q)
        .with_context(|| format!("intraday failed for {}", quote.symbol()))?;
    emit_table(&table, format)
}

pub fn run_price_depth(
    loaded: &LoadedConfig,
    symbol: &str,
    show_log: bool,
    format: OutputFormat,
) -> Result<()> {
    let quote = open_quote(loaded, symbol)?;
    let table = quote
        .price_depth(show_log)
        .with_context(|| format!("price depth failed for {}", quote.symbol()))?;
    emit_table(&table, format)
}
