use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, Order, OrderRequest, Position};
use crate::error::Result;

/// Brokerage trading API seam. All calls hit the remote system; nothing is
/// cached on this side, so every validation sees fresh state.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Current equity/buying-power snapshot.
    async fn get_account(&self) -> Result<Account>;

    /// All currently held positions; possibly empty, order irrelevant.
    async fn get_positions(&self) -> Result<Vec<Position>>;

    /// Orders still open at the brokerage.
    async fn get_open_orders(&self) -> Result<Vec<Order>>;

    /// Submit a new order. Remote rejections surface as `OrderRejected`.
    async fn submit_order(&self, request: &OrderRequest) -> Result<Order>;

    /// Cancel one order by id. Idempotent at the remote end.
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    /// Cancel every open order on the account.
    async fn cancel_all_orders(&self) -> Result<()>;
}

/// One historical price bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Market data seam. `latest_price` returns `Decimal::ZERO` when the lookup
/// fails upstream; zero means "unknown", never a tradable price.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn latest_price(&self, symbol: &str) -> Result<Decimal>;

    async fn bars(&self, symbol: &str, timeframe: &str, limit: u32) -> Result<Vec<Bar>>;
}
