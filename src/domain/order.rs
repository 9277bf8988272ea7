use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TraderError};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that closes a position opened on this side.
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderSide {
    type Err = TraderError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" => Ok(OrderSide::Buy),
            "sell" | "s" => Ok(OrderSide::Sell),
            other => Err(TraderError::Validation(format!(
                "invalid side '{other}'; expected buy|sell"
            ))),
        }
    }
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Good Till Cancelled
    Gtc,
    /// Valid for the trading day
    Day,
    /// Immediate Or Cancel
    Ioc,
}

/// Order status as reported by the brokerage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Accepted,
    PendingNew,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
    Rejected,
    /// Any status string this crate does not model explicitly
    Other,
}

impl OrderStatus {
    /// Parse the brokerage's status vocabulary, tolerating unknown values.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "new" => OrderStatus::New,
            "accepted" => OrderStatus::Accepted,
            "pending_new" => OrderStatus::PendingNew,
            "partially_filled" => OrderStatus::PartiallyFilled,
            "filled" => OrderStatus::Filled,
            "canceled" | "cancelled" => OrderStatus::Cancelled,
            "expired" => OrderStatus::Expired,
            "rejected" => OrderStatus::Rejected,
            _ => OrderStatus::Other,
        }
    }

    /// Open orders conflict with new submissions for the same symbol.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            OrderStatus::New
                | OrderStatus::Accepted
                | OrderStatus::PendingNew
                | OrderStatus::PartiallyFilled
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Expired
                | OrderStatus::Rejected
        )
    }
}

/// Trade intent (what the caller wants to do)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub qty: Decimal,
    pub side: OrderSide,
}

impl TradeIntent {
    pub fn new(symbol: &str, qty: Decimal, side: OrderSide) -> Result<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(TraderError::Validation("symbol must not be empty".into()));
        }
        if qty <= Decimal::ZERO {
            return Err(TraderError::Validation(format!(
                "quantity must be positive, got {qty}"
            )));
        }
        Ok(Self {
            symbol: symbol.to_string(),
            qty,
            side,
        })
    }

    /// Brokerage symbol form: crypto pairs written `BTC-USD` become `BTC/USD`.
    pub fn normalized_symbol(&self) -> String {
        normalize_symbol(&self.symbol)
    }
}

/// Convert a hyphenated pair to the brokerage's slash form and uppercase.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase().replace('-', "/")
}

/// Order request sent to the brokerage
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: Decimal,
    pub side: OrderSide,
    pub time_in_force: TimeInForce,
    pub client_order_id: String,
}

impl OrderRequest {
    /// Market order, good until cancelled.
    pub fn market(symbol: String, qty: Decimal, side: OrderSide) -> Self {
        Self {
            symbol,
            qty,
            side,
            time_in_force: TimeInForce::Gtc,
            client_order_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Order as observed at the brokerage; lifecycle is owned remotely,
/// this crate only inspects and cancels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Decimal,
    pub status: OrderStatus,
    pub filled_avg_price: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
}
