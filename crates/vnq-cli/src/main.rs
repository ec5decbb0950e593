use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;

use commands::quote::{HistoryArgs, IntradayArgs};

#[derive(Parser)]
#[command(name = "vnq")]
#[command(about = "Vietnam market quotes (VCI)", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> local...)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// Output format for tables
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// OHLCV bars for a symbol over a date window
    History {
        /// Ticker, index or derivative code (e.g. ACB, VNINDEX, VN30F1M)
        #[arg(long)]
        symbol: String,

        /// Start: YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS"
        #[arg(long)]
        start: String,

        /// End (inclusive for dates); defaults to now
        #[arg(long)]
        end: Option<String>,

        /// 1m | 5m | 15m | 30m | 1H | 1D | 1W | 1M
        #[arg(long, default_value = "1D")]
        interval: String,

        /// Exact number of bars to request instead of the estimate
        #[arg(long)]
        count_back: Option<u32>,

        /// Decimal places for prices
        #[arg(long, default_value_t = 2)]
        floating: u32,

        /// Log requests at info level
        #[arg(long, default_value_t = false)]
        show_log: bool,
    },

    /// Matched trades for the current session
    Intraday {
        #[arg(long)]
        symbol: String,

        /// Trades per page
        #[arg(long, default_value_t = 100)]
        page_size: u32,

        /// Cursor: only trades before this provider timestamp
        #[arg(long)]
        last_time: Option<String>,

        #[arg(long, default_value_t = false)]
        show_log: bool,
    },

    /// Accumulated volume per price step
    PriceDepth {
        #[arg(long)]
        symbol: String,

        #[arg(long, default_value_t = false)]
        show_log: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Dev-time convenience; absence is fine.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    match cli.cmd {
        Commands::History {
            symbol,
            start,
            end,
            interval,
            count_back,
            floating,
            show_log,
        } => {
            let loaded = commands::load_config(&cli.config_paths)?;
            commands::init_tracing(&loaded.config_json, show_log);
            commands::quote::run_history(
                &loaded,
                HistoryArgs {
                    symbol,
                    start,
                    end,
                    interval,
                    count_back,
                    floating,
                    show_log,
                },
                cli.format,
            )?;
        }

        Commands::Intraday {
            symbol,
            page_size,
            last_time,
            show_log,
        } => {
            let loaded = commands::load_config(&cli.config_paths)?;
            commands::init_tracing(&loaded.config_json, show_log);
            commands::quote::run_intraday(
                &loaded,
                IntradayArgs {
                    symbol,
                    page_size,
                    last_time,
                    show_log,
                },
                cli.format,
            )?;
        }

        Commands::PriceDepth { symbol, show_log } => {
            let loaded = commands::load_config(&cli.config_paths)?;
            commands::init_tracing(&loaded.config_json, show_log);
            commands::quote::run_price_depth(&loaded, &symbol, show_log, cli.format)?;
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = vnq_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}
