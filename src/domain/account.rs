use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderSide;

/// Account snapshot, read-only mirror of the remote state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub equity: Decimal,
    pub buying_power: Decimal,
    pub cash: Decimal,
    pub currency: String,
}

/// Open position, read-only mirror fetched per query, never cached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed quantity: negative for short positions
    pub qty: Decimal,
    pub current_price: Decimal,
    pub avg_entry_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pl: Decimal,
}

impl Position {
    /// Absolute held quantity
    pub fn held_qty(&self) -> Decimal {
        self.qty.abs()
    }

    /// Side of the market order that closes this position.
    pub fn closing_side(&self) -> OrderSide {
        if self.qty >= Decimal::ZERO {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }
}
