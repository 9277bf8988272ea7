//! Alpaca trading-API REST adapter (paper sandbox).
//!
//! Normalizes Alpaca payloads into the domain types so the controller never
//! sees wire shapes. Alpaca serializes every numeric field as a JSON string;
//! parsing is lenient and falls back to zero rather than failing a whole
//! response over one field.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::broker::BrokerClient;
use crate::domain::{Account, Order, OrderRequest, OrderStatus, Position};
use crate::error::{Result, TraderError};

pub const DEFAULT_PAPER_API_BASE: &str = "https://paper-api.alpaca.markets";

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

#[derive(Clone)]
pub struct AlpacaClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

// ==================== API response types ====================

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(default)]
    equity: Option<String>,
    #[serde(default)]
    buying_power: Option<String>,
    #[serde(default)]
    cash: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    symbol: String,
    #[serde(default)]
    qty: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    current_price: Option<String>,
    #[serde(default)]
    avg_entry_price: Option<String>,
    #[serde(default)]
    market_value: Option<String>,
    #[serde(default)]
    unrealized_pl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    #[serde(default)]
    client_order_id: Option<String>,
    symbol: String,
    #[serde(default)]
    qty: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    filled_avg_price: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

fn parse_decimal(raw: Option<&str>) -> Decimal {
    raw.and_then(|s| Decimal::from_str_exact(s.trim()).ok())
        .unwrap_or(Decimal::ZERO)
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl AlpacaClient {
    pub fn new(base_url: Option<&str>, api_key: String, api_secret: String) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_PAPER_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let http = Client::builder()
            .user_agent("papertrader/0.1")
            .build()
            .map_err(|e| {
                TraderError::RemoteUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url,
            api_key,
            api_secret,
        })
    }

    /// Build from `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`, falling back to
    /// config-supplied values. Fails fast when either credential is absent.
    pub fn from_env(base_url: Option<&str>, fallback: &crate::config::AlpacaConfig) -> Result<Self> {
        let api_key = std::env::var("APCA_API_KEY_ID")
            .ok()
            .or_else(|| fallback.api_key.clone())
            .ok_or(TraderError::MissingCredentials("APCA_API_KEY_ID"))?;
        let api_secret = std::env::var("APCA_API_SECRET_KEY")
            .ok()
            .or_else(|| fallback.api_secret.clone())
            .ok_or(TraderError::MissingCredentials("APCA_API_SECRET_KEY"))?;

        Self::new(base_url, api_key, api_secret)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            KEY_HEADER,
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| TraderError::MissingCredentials(KEY_HEADER))?,
        );
        headers.insert(
            SECRET_HEADER,
            HeaderValue::from_str(&self.api_secret)
                .map_err(|_| TraderError::MissingCredentials(SECRET_HEADER))?,
        );
        Ok(headers)
    }

    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .headers(self.auth_headers()?);

        if let Some(query) = query {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Self::api_error(&method, path, status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            TraderError::RemoteUnavailable(format!("invalid Alpaca JSON response: {e}"))
        })
    }

    /// Order submissions surface the remote rejection message; everything
    /// else is a plain remote failure.
    fn api_error(method: &Method, path: &str, status: StatusCode, body: &str) -> TraderError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| body.trim().to_string());

        if *method == Method::POST && path == "/v2/orders" {
            return TraderError::OrderRejected(format!("{status}: {message}"));
        }

        TraderError::RemoteUnavailable(format!("{method} {path} failed: status={status} {message}"))
    }

    fn map_account(resp: AccountResponse) -> Account {
        Account {
            equity: parse_decimal(resp.equity.as_deref()),
            buying_power: parse_decimal(resp.buying_power.as_deref()),
            cash: parse_decimal(resp.cash.as_deref()),
            currency: resp.currency.unwrap_or_else(|| "USD".to_string()),
        }
    }

    fn map_position(resp: PositionResponse) -> Position {
        let mut qty = parse_decimal(resp.qty.as_deref());
        // Alpaca reports short positions as side="short" with negative qty;
        // normalize in case qty comes through unsigned.
        if resp.side.as_deref() == Some("short") && qty > Decimal::ZERO {
            qty = -qty;
        }
        Position {
            symbol: resp.symbol,
            qty,
            current_price: parse_decimal(resp.current_price.as_deref()),
            avg_entry_price: parse_decimal(resp.avg_entry_price.as_deref()),
            market_value: parse_decimal(resp.market_value.as_deref()),
            unrealized_pl: parse_decimal(resp.unrealized_pl.as_deref()),
        }
    }

    fn map_order(resp: OrderResponse) -> Order {
        let side = match resp.side.as_deref() {
            Some("sell") => crate::domain::OrderSide::Sell,
            _ => crate::domain::OrderSide::Buy,
        };
        Order {
            id: resp.id,
            client_order_id: resp.client_order_id,
            symbol: resp.symbol,
            side,
            qty: parse_decimal(resp.qty.as_deref()),
            status: OrderStatus::parse(resp.status.as_deref().unwrap_or("")),
            filled_avg_price: resp
                .filled_avg_price
                .as_deref()
                .and_then(|s| Decimal::from_str_exact(s.trim()).ok()),
            created_at: parse_timestamp(resp.created_at.as_deref()),
        }
    }
}

#[async_trait]
impl BrokerClient for AlpacaClient {
    async fn get_account(&self) -> Result<Account> {
        let value = self
            .request_json(Method::GET, "/v2/account", None, None)
            .await?;
        let resp: AccountResponse = serde_json::from_value(value)?;
        Ok(Self::map_account(resp))
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        let value = self
            .request_json(Method::GET, "/v2/positions", None, None)
            .await?;
        let resp: Vec<PositionResponse> = serde_json::from_value(value)?;
        Ok(resp.into_iter().map(Self::map_position).collect())
    }

    async fn get_open_orders(&self) -> Result<Vec<Order>> {
        let query = [("status", "open".to_string()), ("limit", "500".to_string())];
        let value = self
            .request_json(Method::GET, "/v2/orders", Some(&query), None)
            .await?;
        let resp: Vec<OrderResponse> = serde_json::from_value(value)?;
        Ok(resp.into_iter().map(Self::map_order).collect())
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<Order> {
        let body = json!({
            "symbol": request.symbol,
            "qty": request.qty.normalize().to_string(),
            "side": request.side.as_str(),
            "type": "market",
            "time_in_force": "gtc",
            "client_order_id": request.client_order_id,
        });

        debug!(
            symbol = %request.symbol,
            side = %request.side,
            qty = %request.qty,
            "submitting market order"
        );

        let value = self
            .request_json(Method::POST, "/v2/orders", None, Some(body))
            .await?;
        let resp: OrderResponse = serde_json::from_value(value)?;
        Ok(Self::map_order(resp))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let path = format!("/v2/orders/{order_id}");
        match self.request_json(Method::DELETE, &path, None, None).await {
            Ok(_) => Ok(()),
            // Already gone counts as cancelled.
            Err(TraderError::RemoteUnavailable(msg)) if msg.contains("status=404") => {
                warn!(order_id, "cancel target already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        self.request_json(Method::DELETE, "/v2/orders", None, None)
            .await?;
        Ok(())
    }
}
