//! Behavioral tests for the order controller and bulk liquidator against
//! mocked brokerage/market-data seams.

use async_trait::async_trait;
use mockall::mock;
use papertrader::broker::{Bar, BrokerClient, MarketData};
use papertrader::config::ExecutionConfig;
use papertrader::domain::{
    Account, Order, OrderRequest, OrderSide, OrderStatus, Position, TradeIntent,
};
use papertrader::error::{Result, TraderError};
use papertrader::trading::{Liquidator, OrderController};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Broker {}

    #[async_trait]
    impl BrokerClient for Broker {
        async fn get_account(&self) -> Result<Account>;
        async fn get_positions(&self) -> Result<Vec<Position>>;
        async fn get_open_orders(&self) -> Result<Vec<Order>>;
        async fn submit_order(&self, request: &OrderRequest) -> Result<Order>;
        async fn cancel_order(&self, order_id: &str) -> Result<()>;
        async fn cancel_all_orders(&self) -> Result<()>;
    }
}

mock! {
    pub Data {}

    #[async_trait]
    impl MarketData for Data {
        async fn latest_price(&self, symbol: &str) -> Result<Decimal>;
        async fn bars(&self, symbol: &str, timeframe: &str, limit: u32) -> Result<Vec<Bar>>;
    }
}

fn account(buying_power: Decimal) -> Account {
    Account {
        equity: buying_power,
        buying_power,
        cash: buying_power,
        currency: "USD".to_string(),
    }
}

fn position(symbol: &str, qty: Decimal) -> Position {
    Position {
        symbol: symbol.to_string(),
        qty,
        current_price: dec!(100),
        avg_entry_price: dec!(90),
        market_value: qty * dec!(100),
        unrealized_pl: Decimal::ZERO,
    }
}

fn order(id: &str, symbol: &str, side: OrderSide, status: OrderStatus) -> Order {
    Order {
        id: id.to_string(),
        client_order_id: None,
        symbol: symbol.to_string(),
        side,
        qty: dec!(1),
        status,
        filled_avg_price: None,
        created_at: None,
    }
}

fn fast_config() -> ExecutionConfig {
    ExecutionConfig {
        cancel_poll_ms: 10,
        cancel_timeout_ms: 50,
        pacing_ms: 1,
    }
}

fn controller(broker: MockBroker, data: MockData) -> OrderController {
    OrderController::new(Arc::new(broker), Arc::new(data), fast_config())
}

#[tokio::test]
async fn buy_exceeding_buying_power_fails_without_submit() {
    let mut broker = MockBroker::new();
    broker
        .expect_get_account()
        .returning(|| Ok(account(dec!(100))));
    broker.expect_submit_order().times(0);
    broker.expect_get_open_orders().times(0);

    let mut data = MockData::new();
    data.expect_latest_price()
        .withf(|s| s == "BTC/USD")
        .returning(|_| Ok(dec!(200)));

    let controller = controller(broker, data);
    let intent = TradeIntent::new("BTC-USD", dec!(1), OrderSide::Buy).unwrap();

    match controller.place_order(&intent).await {
        Err(TraderError::InsufficientFunds { required, available }) => {
            assert_eq!(required, dec!(200));
            assert_eq!(available, dec!(100));
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
}

#[tokio::test]
async fn buy_with_unknown_price_fails_without_submit() {
    let mut broker = MockBroker::new();
    broker
        .expect_get_account()
        .returning(|| Ok(account(dec!(10000))));
    broker.expect_submit_order().times(0);

    let mut data = MockData::new();
    data.expect_latest_price().returning(|_| Ok(Decimal::ZERO));

    let controller = controller(broker, data);
    let intent = TradeIntent::new("AAPL", dec!(5), OrderSide::Buy).unwrap();

    assert!(matches!(
        controller.place_order(&intent).await,
        Err(TraderError::PriceUnavailable { .. })
    ));
}

#[tokio::test]
async fn sell_without_position_fails_without_submit() {
    let mut broker = MockBroker::new();
    broker
        .expect_get_positions()
        .returning(|| Ok(vec![position("MSFT", dec!(10))]));
    broker.expect_submit_order().times(0);
    broker.expect_get_open_orders().times(0);

    let controller = controller(broker, MockData::new());
    let intent = TradeIntent::new("AAPL", dec!(5), OrderSide::Sell).unwrap();

    match controller.place_order(&intent).await {
        Err(TraderError::NoOpenPosition { symbol }) => assert_eq!(symbol, "AAPL"),
        other => panic!("expected NoOpenPosition, got {other:?}"),
    }
}

#[tokio::test]
async fn sell_beyond_held_quantity_fails_without_submit() {
    let mut broker = MockBroker::new();
    broker
        .expect_get_positions()
        .returning(|| Ok(vec![position("AAPL", dec!(10))]));
    broker.expect_submit_order().times(0);

    let controller = controller(broker, MockData::new());
    let intent = TradeIntent::new("AAPL", dec!(11), OrderSide::Sell).unwrap();

    match controller.place_order(&intent).await {
        Err(TraderError::InsufficientQuantity {
            requested, held, ..
        }) => {
            assert_eq!(requested, dec!(11));
            assert_eq!(held, dec!(10));
        }
        other => panic!("expected InsufficientQuantity, got {other:?}"),
    }
}

#[tokio::test]
async fn sell_cancels_conflicting_orders_then_submits() {
    let mut broker = MockBroker::new();
    broker
        .expect_get_positions()
        .returning(|| Ok(vec![position("AAPL", dec!(10))]));

    // First sweep sees one conflicting open order; after cancellation the
    // book is confirmed empty.
    let mut calls = 0;
    broker.expect_get_open_orders().returning(move || {
        calls += 1;
        if calls == 1 {
            Ok(vec![order("o1", "AAPL", OrderSide::Buy, OrderStatus::New)])
        } else {
            Ok(vec![])
        }
    });
    broker
        .expect_cancel_order()
        .withf(|id| id == "o1")
        .times(1)
        .returning(|_| Ok(()));
    broker
        .expect_submit_order()
        .withf(|req| req.symbol == "AAPL" && req.side == OrderSide::Sell && req.qty == dec!(5))
        .times(1)
        .returning(|req| {
            Ok(order(
                "submitted",
                &req.symbol,
                req.side,
                OrderStatus::New,
            ))
        });

    let controller = controller(broker, MockData::new());
    let intent = TradeIntent::new("AAPL", dec!(5), OrderSide::Sell).unwrap();

    let placed = controller.place_order(&intent).await.unwrap();
    assert_eq!(placed.id, "submitted");
    assert_eq!(placed.status, OrderStatus::New);
}

#[tokio::test]
async fn buy_submits_with_normalized_symbol() {
    let mut broker = MockBroker::new();
    broker
        .expect_get_account()
        .returning(|| Ok(account(dec!(100000))));
    broker.expect_get_open_orders().returning(|| Ok(vec![]));
    broker
        .expect_submit_order()
        .withf(|req| req.symbol == "BTC/USD" && req.side == OrderSide::Buy)
        .times(1)
        .returning(|req| {
            Ok(order(
                "submitted",
                &req.symbol,
                req.side,
                OrderStatus::Accepted,
            ))
        });

    let mut data = MockData::new();
    data.expect_latest_price()
        .withf(|s| s == "BTC/USD")
        .returning(|_| Ok(dec!(50000)));

    let controller = controller(broker, data);
    let intent = TradeIntent::new("btc-usd", dec!(1), OrderSide::Buy).unwrap();

    let placed = controller.place_order(&intent).await.unwrap();
    assert_eq!(placed.symbol, "BTC/USD");
}

#[tokio::test]
async fn unconfirmed_cancellation_times_out_without_submit() {
    let mut broker = MockBroker::new();
    broker
        .expect_get_positions()
        .returning(|| Ok(vec![position("AAPL", dec!(10))]));
    // The conflicting order never leaves the book.
    broker
        .expect_get_open_orders()
        .returning(|| Ok(vec![order("stuck", "AAPL", OrderSide::Buy, OrderStatus::New)]));
    broker.expect_cancel_order().returning(|_| Ok(()));
    broker.expect_submit_order().times(0);

    let controller = controller(broker, MockData::new());
    let intent = TradeIntent::new("AAPL", dec!(5), OrderSide::Sell).unwrap();

    match controller.place_order(&intent).await {
        Err(TraderError::CancelTimeout { symbol, pending }) => {
            assert_eq!(symbol, "AAPL");
            assert_eq!(pending, 1);
        }
        other => panic!("expected CancelTimeout, got {other:?}"),
    }
}

fn liquidator(broker: MockBroker, data: MockData) -> Liquidator {
    let broker: Arc<MockBroker> = Arc::new(broker);
    let controller = Arc::new(OrderController::new(
        broker.clone(),
        Arc::new(data),
        fast_config(),
    ));
    Liquidator::new(broker, controller, Duration::from_millis(1))
}

#[tokio::test]
async fn close_position_without_position_is_a_noop() {
    let mut broker = MockBroker::new();
    broker.expect_get_positions().returning(|| Ok(vec![]));
    broker.expect_submit_order().times(0);
    broker.expect_cancel_order().times(0);

    let liquidator = liquidator(broker, MockData::new());
    assert!(liquidator.close_position("AAPL").await.unwrap().is_none());
}

#[tokio::test]
async fn close_all_with_no_positions_succeeds_without_submit() {
    let mut broker = MockBroker::new();
    broker
        .expect_cancel_all_orders()
        .times(1)
        .returning(|| Ok(()));
    broker.expect_get_positions().returning(|| Ok(vec![]));
    broker.expect_submit_order().times(0);

    let liquidator = liquidator(broker, MockData::new());
    let report = liquidator.close_all_positions().await.unwrap();
    assert!(report.is_complete());
    assert!(report.outcomes.is_empty());
}

#[tokio::test]
async fn close_all_continues_past_individual_failures() {
    let mut broker = MockBroker::new();
    broker.expect_cancel_all_orders().returning(|| Ok(()));
    broker.expect_get_positions().returning(|| {
        Ok(vec![
            position("AAPL", dec!(10)),
            position("MSFT", dec!(-5)),
        ])
    });
    broker.expect_get_open_orders().returning(|| Ok(vec![]));
    // Closing the short MSFT position is a buy, which re-checks funds.
    broker
        .expect_get_account()
        .returning(|| Ok(account(dec!(100000))));
    // AAPL close succeeds, MSFT close is rejected remotely.
    broker
        .expect_submit_order()
        .withf(|req| req.symbol == "AAPL")
        .times(1)
        .returning(|req| {
            Ok(order("a1", &req.symbol, req.side, OrderStatus::Filled))
        });
    broker
        .expect_submit_order()
        .withf(|req| req.symbol == "MSFT")
        .times(1)
        .returning(|_| Err(TraderError::OrderRejected("simulated".to_string())));

    let mut data = MockData::new();
    data.expect_latest_price().returning(|_| Ok(dec!(100)));

    let liquidator = liquidator(broker, data);
    let report = liquidator.close_all_positions().await.unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.closed(), 1);
    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.failed()[0].0, "MSFT");
}

#[tokio::test]
async fn bars_view_renders_with_indicator_columns() {
    use chrono::{Duration as ChronoDuration, Utc};

    let mut data = MockData::new();
    data.expect_bars()
        .withf(|s, tf, limit| s == "AAPL" && tf == "1Day" && *limit == 60)
        .returning(|_, _, _| {
            let start = Utc::now() - ChronoDuration::days(60);
            Ok((0..60)
                .map(|i| Bar {
                    timestamp: start + ChronoDuration::days(i),
                    open: Decimal::from(100 + i),
                    high: Decimal::from(101 + i),
                    low: Decimal::from(99 + i),
                    close: Decimal::from(100 + i),
                    volume: Decimal::from(1000),
                })
                .collect())
        });

    // 60 bars is enough for the SMA20, SMA50 and RSI14 columns to fill.
    papertrader::cli::show_bars(&data, "aapl", "1Day", 60)
        .await
        .unwrap();
}

#[tokio::test]
async fn short_position_closes_with_buy_order() {
    let mut broker = MockBroker::new();
    broker
        .expect_get_positions()
        .returning(|| Ok(vec![position("MSFT", dec!(-5))]));
    broker.expect_get_open_orders().returning(|| Ok(vec![]));
    broker
        .expect_get_account()
        .returning(|| Ok(account(dec!(100000))));
    broker
        .expect_submit_order()
        .withf(|req| req.symbol == "MSFT" && req.side == OrderSide::Buy && req.qty == dec!(5))
        .times(1)
        .returning(|req| {
            Ok(order("b1", &req.symbol, req.side, OrderStatus::New))
        });

    let mut data = MockData::new();
    data.expect_latest_price().returning(|_| Ok(dec!(100)));

    let liquidator = liquidator(broker, data);
    let closed = liquidator.close_position("MSFT").await.unwrap();
    assert!(closed.is_some());
}
