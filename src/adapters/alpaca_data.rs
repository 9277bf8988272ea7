//! Alpaca market-data adapter.
//!
//! Serves the latest trade price and historical bars. A failed price lookup
//! returns `Decimal::ZERO` rather than an error; zero means "unknown" and
//! the controller refuses to size a buy against it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::broker::{Bar, MarketData};
use crate::domain::normalize_symbol;
use crate::error::{Result, TraderError};

pub const DEFAULT_DATA_API_BASE: &str = "https://data.alpaca.markets";

#[derive(Clone)]
pub struct AlpacaDataClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct LatestTrade {
    #[serde(rename = "p")]
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    open: Decimal,
    #[serde(rename = "h")]
    high: Decimal,
    #[serde(rename = "l")]
    low: Decimal,
    #[serde(rename = "c")]
    close: Decimal,
    #[serde(rename = "v")]
    volume: Decimal,
}

impl From<RawBar> for Bar {
    fn from(raw: RawBar) -> Self {
        Bar {
            timestamp: raw.timestamp,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
        }
    }
}

fn is_crypto(symbol: &str) -> bool {
    symbol.contains('/')
}

impl AlpacaDataClient {
    pub fn new(base_url: Option<&str>, api_key: String, api_secret: String) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_DATA_API_BASE)
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

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| TraderError::MissingCredentials("APCA_API_KEY_ID"))?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            HeaderValue::from_str(&self.api_secret)
                .map_err(|_| TraderError::MissingCredentials("APCA_API_SECRET_KEY"))?,
        );
        Ok(headers)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .request(Method::GET, &url)
            .headers(self.auth_headers()?)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(TraderError::RemoteUnavailable(format!(
                "GET {path} failed: status={status} {}",
                text.trim()
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            TraderError::RemoteUnavailable(format!("invalid Alpaca data response: {e}"))
        })
    }

    async fn latest_stock_trade(&self, symbol: &str) -> Result<Option<LatestTrade>> {
        let path = format!("/v2/stocks/{symbol}/trades/latest");
        let value = self.get_json(&path, &[]).await?;
        Ok(value
            .get("trade")
            .cloned()
            .and_then(|t| serde_json::from_value(t).ok()))
    }

    async fn latest_crypto_trade(&self, symbol: &str) -> Result<Option<LatestTrade>> {
        let value = self
            .get_json(
                "/v1beta3/crypto/us/latest/trades",
                &[("symbols", symbol.to_string())],
            )
            .await?;
        Ok(value
            .get("trades")
            .and_then(|t| t.get(symbol))
            .cloned()
            .and_then(|t| serde_json::from_value(t).ok()))
    }
}

#[async_trait]
impl MarketData for AlpacaDataClient {
    async fn latest_price(&self, symbol: &str) -> Result<Decimal> {
        let symbol = normalize_symbol(symbol);
        let lookup = if is_crypto(&symbol) {
            self.latest_crypto_trade(&symbol).await
        } else {
            self.latest_stock_trade(&symbol).await
        };

        match lookup {
            Ok(Some(trade)) => Ok(trade.price),
            Ok(None) => {
                warn!(%symbol, "no latest trade in data response");
                Ok(Decimal::ZERO)
            }
            Err(e) => {
                warn!(%symbol, error = %e, "price lookup failed");
                Ok(Decimal::ZERO)
            }
        }
    }

    async fn bars(&self, symbol: &str, timeframe: &str, limit: u32) -> Result<Vec<Bar>> {
        let symbol = normalize_symbol(symbol);
        let value = if is_crypto(&symbol) {
            self.get_json(
                "/v1beta3/crypto/us/bars",
                &[
                    ("symbols", symbol.clone()),
                    ("timeframe", timeframe.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?
        } else {
            let path = format!("/v2/stocks/{symbol}/bars");
            self.get_json(
                &path,
                &[
                    ("timeframe", timeframe.to_string()),
                    ("limit", limit.to_string()),
                    ("adjustment", "split".to_string()),
                ],
            )
            .await?
        };

        // Stocks: {"bars": [...]}; crypto: {"bars": {"BTC/USD": [...]}}
        let bars_value = match value.get("bars") {
            Some(Value::Array(items)) => Value::Array(items.clone()),
            Some(obj @ Value::Object(_)) => obj.get(&symbol).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        };

        let raw: Vec<RawBar> = match bars_value {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other)?,
        };

        Ok(raw.into_iter().map(Bar::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_detection_uses_slash_form() {
        assert!(is_crypto("BTC/USD"));
        assert!(!is_crypto("AAPL"));
        assert!(!is_crypto("BRK.B"));
    }

    #[test]
    fn raw_bar_deserializes_alpaca_field_names() {
        let raw: RawBar = serde_json::from_str(
            r#"{"t":"2024-05-01T13:30:00Z","o":100.0,"h":101.5,"l":99.5,"c":101.0,"v":12345}"#,
        )
        .expect("bar should parse");
        let bar = Bar::from(raw);
        assert_eq!(bar.close, Decimal::from_str_exact("101.0").unwrap());
    }
}
