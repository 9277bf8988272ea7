pub mod adapters;
pub mod broker;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod trading;

pub use adapters::{AlpacaClient, AlpacaDataClient};
pub use broker::{Bar, BrokerClient, MarketData};
pub use config::AppConfig;
pub use domain::{
    Account, Order, OrderRequest, OrderSide, OrderStatus, Position, TimeInForce, TradeIntent,
};
pub use error::{Result, TraderError};
pub use trading::{CloseOutcome, LiquidationReport, Liquidator, OrderController};
