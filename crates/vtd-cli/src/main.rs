use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "vtd")]
#[command(about = "Virtual trading desk: paper ledger and portfolio value history", long_about = None)]
struct Cli {
    /// Directory of the JSON key-value store (overrides store.dir)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Layered config paths in merge order (base -> local ...)
    #[arg(long = "config", global = true)]
    config_paths: Vec<PathBuf>,

    /// Never call the quote oracle; prices fall back to last known / cost basis
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buy shares. Without --price the current quote is used.
    Buy {
        symbol: String,
        shares: f64,
        #[arg(long)]
        price: Option<f64>,
    },

    /// Sell shares. Without --price the current quote is used.
    Sell {
        symbol: String,
        shares: f64,
        #[arg(long)]
        price: Option<f64>,
    },

    /// Cash, holdings, gain/loss and allocation
    Show {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the value history (rebuilt from the trade log if not cached)
    History {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Discard the cached value history and rebuild it
    Rebuild {
        /// Use simulated price paths instead of live quotes
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },

    /// Re-mark holdings and append one value point
    Refresh,

    /// Refresh on an interval until Ctrl-C
    Watch {
        /// Overrides refresh.interval_secs
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Delete the portfolio and its value history. Requires --yes.
    Reset {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let desk = commands::Desk::open(&cli.config_paths, cli.store_dir, cli.offline)?;

    match cli.cmd {
        Commands::Buy {
            symbol,
            shares,
            price,
        } => commands::trade::run_trade(&desk, "buy", &symbol, shares, price).await,
        Commands::Sell {
            symbol,
            shares,
            price,
        } => commands::trade::run_trade(&desk, "sell", &symbol, shares, price).await,
        Commands::Show { json } => commands::report::show(&desk, json).await,
        Commands::History { json } => commands::report::history(&desk, json).await,
        Commands::Rebuild { synthetic } => commands::report::rebuild(&desk, synthetic).await,
        Commands::Refresh => commands::report::refresh(&desk).await,
        Commands::Watch { interval_secs } => commands::report::watch(&desk, interval_secs).await,
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!(
                    "REFUSING RESET: this deletes the portfolio and its history. Re-run with: `vtd reset --yes`"
                );
            }
            desk.service.reset().await?;
            println!("reset=OK");
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
