use clap::Parser;
use papertrader::adapters::{AlpacaClient, AlpacaDataClient};
use papertrader::cli::{self, Cli, Commands};
use papertrader::config::AppConfig;
use papertrader::domain::OrderSide;
use papertrader::error::Result;
use papertrader::trading::{Liquidator, OrderController};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load_from(&cli.config)?;
    init_logging(&config.logging.level);

    if let Err(errors) = config.validate() {
        return Err(papertrader::TraderError::Validation(errors.join("; ")));
    }

    let broker = Arc::new(AlpacaClient::from_env(
        Some(config.alpaca.trading_url.as_str()),
        &config.alpaca,
    )?);
    let data = Arc::new(AlpacaDataClient::new(
        Some(config.alpaca.data_url.as_str()),
        std::env::var("APCA_API_KEY_ID")
            .ok()
            .or_else(|| config.alpaca.api_key.clone())
            .unwrap_or_default(),
        std::env::var("APCA_API_SECRET_KEY")
            .ok()
            .or_else(|| config.alpaca.api_secret.clone())
            .unwrap_or_default(),
    )?);

    let controller = Arc::new(OrderController::new(
        broker.clone(),
        data.clone(),
        config.execution.clone(),
    ));
    let liquidator = Liquidator::new(
        broker.clone(),
        controller.clone(),
        Duration::from_millis(config.execution.pacing_ms),
    );

    match &cli.command {
        Commands::Account => cli::show_account(broker.as_ref()).await,
        Commands::Positions => cli::show_positions(broker.as_ref()).await,
        Commands::Orders => cli::show_orders(broker.as_ref()).await,
        Commands::Quote { symbol } => cli::show_quote(data.as_ref(), symbol).await,
        Commands::Bars {
            symbol,
            timeframe,
            limit,
        } => cli::show_bars(data.as_ref(), symbol, timeframe, *limit).await,
        Commands::Buy { symbol, qty } => {
            cli::place(&controller, symbol, *qty, OrderSide::Buy).await
        }
        Commands::Sell { symbol, qty } => {
            cli::place(&controller, symbol, *qty, OrderSide::Sell).await
        }
        Commands::Close { symbol } => cli::close_position(&liquidator, symbol).await,
        Commands::CloseAll => cli::close_all(&liquidator).await,
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,papertrader={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
