//! Bulk liquidation: cancel everything, then close each position through the
//! order controller. A failure closing one position never aborts the loop;
//! the report carries a per-symbol outcome so callers can tell partial from
//! total success.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::broker::BrokerClient;
use crate::domain::{normalize_symbol, Order, Position, TradeIntent};
use crate::error::Result;
use crate::trading::OrderController;

pub struct Liquidator {
    broker: Arc<dyn BrokerClient>,
    controller: Arc<OrderController>,
    /// Pause between successive closes, against brokerage rate limits.
    pacing: Duration,
}

/// Outcome of one attempted close
#[derive(Debug, Clone)]
pub enum CloseOutcome {
    Closed(Order),
    Failed(String),
}

/// Per-symbol outcomes of a bulk liquidation
#[derive(Debug, Clone, Default)]
pub struct LiquidationReport {
    pub outcomes: Vec<(String, CloseOutcome)>,
}

impl LiquidationReport {
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, o)| matches!(o, CloseOutcome::Closed(_)))
    }

    pub fn closed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, CloseOutcome::Closed(_)))
            .count()
    }

    pub fn failed(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(symbol, o)| match o {
                CloseOutcome::Failed(reason) => Some((symbol.as_str(), reason.as_str())),
                CloseOutcome::Closed(_) => None,
            })
            .collect()
    }
}

impl std::fmt::Display for LiquidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} closed, {} failed of {} position(s)",
            self.closed(),
            self.failed().len(),
            self.outcomes.len()
        )
    }
}

impl Liquidator {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        controller: Arc<OrderController>,
        pacing: Duration,
    ) -> Self {
        Self {
            broker,
            controller,
            pacing,
        }
    }

    /// Close the position for one symbol with an opposing market order.
    /// No open position is a no-op, not an error.
    pub async fn close_position(&self, symbol: &str) -> Result<Option<Order>> {
        let symbol = normalize_symbol(symbol);
        let positions = self.broker.get_positions().await?;

        let Some(position) = positions
            .iter()
            .find(|p| normalize_symbol(&p.symbol) == symbol)
        else {
            info!(%symbol, "no open position, nothing to close");
            return Ok(None);
        };

        let order = self.close(position).await?;
        Ok(Some(order))
    }

    /// Cancel all open orders system-wide, then close every position.
    /// Individual failures are recorded and skipped.
    pub async fn close_all_positions(&self) -> Result<LiquidationReport> {
        self.broker.cancel_all_orders().await?;
        sleep(self.pacing).await;

        let positions = self.broker.get_positions().await?;
        info!(count = positions.len(), "liquidating all positions");

        let mut report = LiquidationReport::default();
        for (i, position) in positions.iter().enumerate() {
            if i > 0 {
                sleep(self.pacing).await;
            }

            let symbol = normalize_symbol(&position.symbol);
            match self.close(position).await {
                Ok(order) => {
                    report.outcomes.push((symbol, CloseOutcome::Closed(order)));
                }
                Err(e) => {
                    error!(%symbol, error = %e, "failed to close position, continuing");
                    report
                        .outcomes
                        .push((symbol, CloseOutcome::Failed(e.to_string())));
                }
            }
        }

        info!(%report, "liquidation finished");
        Ok(report)
    }

    async fn close(&self, position: &Position) -> Result<Order> {
        let intent = TradeIntent::new(
            &position.symbol,
            position.held_qty(),
            position.closing_side(),
        )?;
        self.controller.place_order(&intent).await
    }
}
