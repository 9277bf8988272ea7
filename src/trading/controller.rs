//! Paper-trading order controller.
//!
//! Converts a validated trade intent into a confirmed brokerage action:
//! funds/position checks, conflicting-order cancellation with confirmation,
//! then a GTC market-order submit. Every validation re-queries the remote
//! system; no state is held between calls. Semantics across a single call
//! are at-least-once cancel, at-most-once submit: cancellations performed
//! before a failed submit are not rolled back.

use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::broker::{BrokerClient, MarketData};
use crate::config::ExecutionConfig;
use crate::domain::{normalize_symbol, Order, OrderRequest, OrderSide, TradeIntent};
use crate::error::{Result, TraderError};

pub struct OrderController {
    broker: Arc<dyn BrokerClient>,
    market_data: Arc<dyn MarketData>,
    config: ExecutionConfig,
    /// Per-symbol mutexes guarding the cancel-then-submit sequence. Two
    /// concurrent calls for the same symbol would otherwise both observe the
    /// pre-cancellation order book and defeat the wash-trade mitigation.
    symbol_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OrderController {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        market_data: Arc<dyn MarketData>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            broker,
            market_data,
            config,
            symbol_locks: DashMap::new(),
        }
    }

    pub fn broker(&self) -> &Arc<dyn BrokerClient> {
        &self.broker
    }

    pub fn market_data(&self) -> &Arc<dyn MarketData> {
        &self.market_data
    }

    /// Validate the intent against the remote account/position state, clear
    /// conflicting open orders for the symbol, then submit a market order.
    pub async fn place_order(&self, intent: &TradeIntent) -> Result<Order> {
        let symbol = intent.normalized_symbol();
        let correlation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "place_order",
            %symbol,
            side = %intent.side,
            qty = %intent.qty,
            %correlation_id,
        );
        self.place_order_in_span(intent, symbol).instrument(span).await
    }

    async fn place_order_in_span(&self, intent: &TradeIntent, symbol: String) -> Result<Order> {
        match intent.side {
            OrderSide::Buy => self.check_buying_power(&symbol, intent.qty).await?,
            OrderSide::Sell => self.check_held_quantity(&symbol, intent.qty).await?,
        }

        let lock = {
            let entry = self.symbol_locks.entry(symbol.clone()).or_default();
            entry.value().clone()
        };
        let _guard = lock.lock().await;

        self.clear_conflicting_orders(&symbol).await?;

        let request = OrderRequest::market(symbol.clone(), intent.qty, intent.side);
        let order = self.broker.submit_order(&request).await?;

        info!(
            order_id = %order.id,
            status = ?order.status,
            "order submitted"
        );
        Ok(order)
    }

    /// Buy sizing: required notional must fit inside buying power. A zero
    /// price from the data source means "unknown" and is never tradable.
    async fn check_buying_power(&self, symbol: &str, qty: Decimal) -> Result<()> {
        let account = self.broker.get_account().await?;
        let price = self.market_data.latest_price(symbol).await?;

        if price <= Decimal::ZERO {
            return Err(TraderError::PriceUnavailable {
                symbol: symbol.to_string(),
            });
        }

        let required = qty * price;
        debug!(%price, %required, buying_power = %account.buying_power, "buy sizing");

        if required > account.buying_power {
            return Err(TraderError::InsufficientFunds {
                required,
                available: account.buying_power,
            });
        }
        Ok(())
    }

    /// Sell sizing: the symbol must be held, and no more than the absolute
    /// held quantity may be sold.
    async fn check_held_quantity(&self, symbol: &str, qty: Decimal) -> Result<()> {
        let positions = self.broker.get_positions().await?;
        let position = positions
            .iter()
            .find(|p| normalize_symbol(&p.symbol) == symbol)
            .ok_or_else(|| TraderError::NoOpenPosition {
                symbol: symbol.to_string(),
            })?;

        let held = position.held_qty();
        if qty > held {
            return Err(TraderError::InsufficientQuantity {
                symbol: symbol.to_string(),
                requested: qty,
                held,
            });
        }
        Ok(())
    }

    /// Cancel every open order for the symbol, then poll until the brokerage
    /// confirms none remain or the bound elapses. Submitting while an
    /// opposing order is still open draws a wash-trade rejection, and the
    /// remote system is eventually consistent with respect to cancellation,
    /// so a confirmed-empty book is required before submit.
    async fn clear_conflicting_orders(&self, symbol: &str) -> Result<()> {
        let open: Vec<Order> = self
            .broker
            .get_open_orders()
            .await?
            .into_iter()
            .filter(|o| o.status.is_open() && normalize_symbol(&o.symbol) == symbol)
            .collect();

        if open.is_empty() {
            return Ok(());
        }

        info!(count = open.len(), "cancelling conflicting open orders");
        for order in &open {
            self.broker.cancel_order(&order.id).await?;
        }

        let poll = Duration::from_millis(self.config.cancel_poll_ms);
        let deadline = Instant::now() + Duration::from_millis(self.config.cancel_timeout_ms);

        loop {
            sleep(poll).await;

            let pending = self
                .broker
                .get_open_orders()
                .await?
                .into_iter()
                .filter(|o| o.status.is_open() && normalize_symbol(&o.symbol) == symbol)
                .count();

            if pending == 0 {
                debug!("cancellations confirmed");
                return Ok(());
            }

            if Instant::now() >= deadline {
                warn!(pending, "cancellation not confirmed before deadline");
                return Err(TraderError::CancelTimeout {
                    symbol: symbol.to_string(),
                    pending,
                });
            }
        }
    }
}
