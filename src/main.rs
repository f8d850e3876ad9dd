//! Ridgeline CLI and server.
//!
//! Commands:
//! - `serve`: start the HTTP API (default)
//! - `ingest`: fetch Binance klines into SQLite
//! - `train`: train a model bundle from stored candles
//! - `backtest`: replay a trained bundle over stored candles

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ridgeline::config::Config;
use ridgeline::services::{
    Backtester, BinanceKlines, CandleStore, ModelBundle, Trainer, TrainingConfig,
};
use ridgeline::AppState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "ridgeline",
    version,
    about = "Ridgeline: peak/valley signal classifier and backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve,
    /// Fetch historical klines from Binance into the candle store.
    Ingest {
        /// Trading pair (defaults to ASSET).
        #[arg(long)]
        asset: Option<String>,

        /// Kline interval (1m, 5m, 1h, ...).
        #[arg(long, default_value = "5m")]
        interval: String,

        /// Days of history to fetch.
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Train a model bundle on stored candles.
    Train {
        /// Trading pair (defaults to ASSET).
        #[arg(long)]
        asset: Option<String>,

        /// Training epochs.
        #[arg(long)]
        epochs: Option<usize>,

        /// Only use the latest N candles.
        #[arg(long)]
        limit: Option<usize>,

        /// Absolute label separation, overriding LABEL_DISTANCE_FRACTION.
        #[arg(long)]
        distance: Option<usize>,
    },
    /// Replay the trained bundle over stored candles.
    Backtest {
        /// Trading pair (defaults to ASSET).
        #[arg(long)]
        asset: Option<String>,

        /// Number of latest candles to replay (defaults to BACKTEST_WINDOW).
        #[arg(long)]
        limit: Option<usize>,

        /// Starting balance (defaults to INITIAL_BALANCE).
        #[arg(long)]
        balance: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ridgeline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Ingest {
            asset,
            interval,
            days,
        } => {
            let asset = asset.unwrap_or_else(|| config.asset.clone());
            ingest(&config, &asset, &interval, days).await
        }
        Commands::Train {
            asset,
            epochs,
            limit,
            distance,
        } => {
            let asset = asset.unwrap_or_else(|| config.asset.clone());
            train(&config, &asset, epochs, limit, distance)
        }
        Commands::Backtest {
            asset,
            limit,
            balance,
        } => {
            let asset = asset.unwrap_or_else(|| config.asset.clone());
            backtest(&config, &asset, limit, balance)
        }
    }
}

fn open_store(config: &Config) -> Result<CandleStore> {
    CandleStore::new(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Ridgeline server on {}:{}", config.host, config.port);

    let store = open_store(&config)?;
    let addr = config.addr();
    let state = AppState::new(config, store);

    info!(
        "Model bundle directory: {} (load with GET /api/model/load)",
        state.models.model_dir().display()
    );

    let app = ridgeline::app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Ridgeline server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn ingest(config: &Config, asset: &str, interval: &str, days: i64) -> Result<()> {
    if days <= 0 {
        bail!("--days must be positive");
    }
    let store = open_store(config)?;
    let client = BinanceKlines::new(config.binance_api_url.clone());
    let start = chrono::Utc::now().timestamp_millis() - days * 24 * 60 * 60 * 1000;

    let written = client.backfill(&store, asset, interval, start).await?;
    println!(
        "Stored {} {} candles ({} total)",
        written,
        asset,
        store.candle_count(asset)?
    );
    Ok(())
}

fn train(
    config: &Config,
    asset: &str,
    epochs: Option<usize>,
    limit: Option<usize>,
    distance: Option<usize>,
) -> Result<()> {
    let store = open_store(config)?;
    let candles = match limit {
        Some(limit) => store.latest_candles(asset, limit)?,
        None => store.all_candles(asset)?,
    };
    if candles.is_empty() {
        bail!("No candles stored for {}; run `ridgeline ingest` first", asset);
    }

    let mut training = TrainingConfig::default();
    if let Some(epochs) = epochs {
        training.epochs = epochs;
    }
    let mut labeler = config.labeler();
    if let Some(distance) = distance {
        labeler = labeler.with_distance(distance);
    }

    let outcome = Trainer::new(training, labeler).train(asset, &candles)?;
    outcome.bundle.save(&config.model_dir)?;

    println!(
        "Trained on {} rows (buy {}, hold {}, sell {})",
        outcome.bundle.manifest.train_rows,
        outcome.label_counts[0],
        outcome.label_counts[1],
        outcome.label_counts[2]
    );
    for class in &outcome.calibrations {
        println!(
            "  class {}: cutoff {:.4}  AUC {:.3}  J {:.3}",
            class.class, class.cutoff, class.auc, class.youden_j
        );
    }
    println!(
        "Validation accuracy {:.1}% over {} rows",
        outcome.validation.accuracy * 100.0,
        outcome.validation.rows
    );
    println!("Bundle written to {}", config.model_dir.display());
    Ok(())
}

fn backtest(
    config: &Config,
    asset: &str,
    limit: Option<usize>,
    balance: Option<f64>,
) -> Result<()> {
    let store = open_store(config)?;
    let bundle = ModelBundle::load(&config.model_dir)?;
    let candles = store.latest_candles(asset, limit.unwrap_or(config.backtest_window))?;
    let steps = bundle.decide(&candles)?;
    let report = Backtester::new(balance.unwrap_or(config.initial_balance)).run(&steps)?;

    println!("Steps:          {}", report.trajectory.len());
    println!("Trades:         {}", report.trade_count);
    println!("Win rate:       {:.1}%", report.win_rate_pct);
    println!("Initial:        {:.2}", report.initial_balance);
    println!("Final:          {:.2}", report.final_balance);
    println!("Return:         {:.2}%", report.total_return_pct);
    println!("Buy & hold:     {:.2}%", report.buy_and_hold_return_pct);
    println!("Max drawdown:   {:.2}%", report.max_drawdown_pct);
    println!("Sharpe:         {:.3}", report.sharpe_ratio);
    println!("Sortino:        {:.3}", report.sortino_ratio);
    println!("Calmar:         {:.3}", report.calmar_ratio);
    Ok(())
}
