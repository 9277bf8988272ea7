use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::broker::{BrokerClient, MarketData};
use crate::domain::{normalize_symbol, OrderSide, TradeIntent};
use crate::error::Result;
use crate::trading::{indicators, Liquidator, OrderController};

#[derive(Parser)]
#[command(name = "papertrader")]
#[command(version = "0.1.0")]
#[command(about = "Alpaca paper-trading order controller", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show account equity and buying power
    Account,
    /// List open positions
    Positions,
    /// List open orders
    Orders,
    /// Show the latest trade price for a symbol
    Quote {
        /// Ticker or crypto pair (e.g. AAPL, BTC-USD)
        symbol: String,
    },
    /// Show recent bars with SMA/RSI columns
    Bars {
        /// Ticker or crypto pair
        symbol: String,
        /// Bar timeframe (e.g. 1Min, 1Hour, 1Day)
        #[arg(short, long, default_value = "1Day")]
        timeframe: String,
        /// Number of bars to fetch
        #[arg(short, long, default_value = "60")]
        limit: u32,
    },
    /// Submit a paper buy order
    Buy {
        symbol: String,
        qty: Decimal,
    },
    /// Submit a paper sell order
    Sell {
        symbol: String,
        qty: Decimal,
    },
    /// Close the position for one symbol
    Close {
        symbol: String,
    },
    /// Cancel all open orders and close every position
    CloseAll,
}

pub async fn show_account(broker: &dyn BrokerClient) -> Result<()> {
    let account = broker.get_account().await?;
    println!(
        "Equity: ${} | Buying power: ${} | Cash: ${} ({})",
        account.equity, account.buying_power, account.cash, account.currency
    );
    Ok(())
}

pub async fn show_positions(broker: &dyn BrokerClient) -> Result<()> {
    let positions = broker.get_positions().await?;
    if positions.is_empty() {
        println!("No open positions");
        return Ok(());
    }

    println!(
        "{:<10} {:>12} {:>12} {:>12} {:>12}",
        "SYMBOL", "QTY", "ENTRY", "PRICE", "UNREAL P/L"
    );
    for p in positions {
        println!(
            "{:<10} {:>12} {:>12} {:>12} {:>12}",
            p.symbol, p.qty, p.avg_entry_price, p.current_price, p.unrealized_pl
        );
    }
    Ok(())
}

pub async fn show_orders(broker: &dyn BrokerClient) -> Result<()> {
    let orders = broker.get_open_orders().await?;
    if orders.is_empty() {
        println!("No open orders");
        return Ok(());
    }

    println!(
        "{:<38} {:<10} {:<6} {:>10} {:<12}",
        "ID", "SYMBOL", "SIDE", "QTY", "STATUS"
    );
    for o in orders {
        println!(
            "{:<38} {:<10} {:<6} {:>10} {:<12}",
            o.id,
            o.symbol,
            o.side,
            o.qty,
            format!("{:?}", o.status)
        );
    }
    Ok(())
}

pub async fn show_quote(data: &dyn MarketData, symbol: &str) -> Result<()> {
    let normalized = normalize_symbol(symbol);
    let price = data.latest_price(&normalized).await?;
    if price.is_zero() {
        println!("{normalized}: price unavailable");
    } else {
        println!("{normalized}: ${price}");
    }
    Ok(())
}

pub async fn show_bars(
    data: &dyn MarketData,
    symbol: &str,
    timeframe: &str,
    limit: u32,
) -> Result<()> {
    let normalized = normalize_symbol(symbol);
    let bars = data.bars(&normalized, timeframe, limit).await?;
    if bars.is_empty() {
        println!("No bars for {normalized}");
        return Ok(());
    }

    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    let sma20 = indicators::sma(&closes, 20);
    let sma50 = indicators::sma(&closes, 50);
    let rsi14 = indicators::rsi(&closes, 14);

    println!(
        "{:<22} {:>12} {:>12} {:>12} {:>10}",
        "TIME", "CLOSE", "SMA20", "SMA50", "RSI14"
    );
    for (i, bar) in bars.iter().enumerate() {
        let fmt = |v: Option<Decimal>| {
            v.map(|d| d.round_dp(2).to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "{:<22} {:>12} {:>12} {:>12} {:>10}",
            bar.timestamp.format("%Y-%m-%d %H:%M"),
            bar.close.round_dp(2),
            fmt(sma20[i]),
            fmt(sma50[i]),
            fmt(rsi14[i]),
        );
    }
    Ok(())
}

pub async fn place(
    controller: &OrderController,
    symbol: &str,
    qty: Decimal,
    side: OrderSide,
) -> Result<()> {
    let intent = TradeIntent::new(symbol, qty, side)?;
    let order = controller.place_order(&intent).await?;
    println!(
        "Order {}: {} {} {} (status {:?})",
        order.id, order.side, order.qty, order.symbol, order.status
    );
    Ok(())
}

pub async fn close_position(liquidator: &Liquidator, symbol: &str) -> Result<()> {
    match liquidator.close_position(symbol).await? {
        Some(order) => println!(
            "Closing order {}: {} {} {} (status {:?})",
            order.id, order.side, order.qty, order.symbol, order.status
        ),
        None => println!("No open position for {}", normalize_symbol(symbol)),
    }
    Ok(())
}

pub async fn close_all(liquidator: &Liquidator) -> Result<()> {
    let report = liquidator.close_all_positions().await?;
    println!("{report}");
    for (symbol, reason) in report.failed() {
        println!("  failed {symbol}: {reason}");
    }
    Ok(())
}
