use crate::broker::BrokerClient;
use crate::config::Settings;
use crate::domain::order::{Account, MarketOrder, OrderSide, OrderSize, Position, TimeInForce};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";
const LIVE_BASE_URL: &str = "https://api.alpaca.markets";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub struct AlpacaClient {
    http: reqwest::Client,
    base_url: String,
}

impl AlpacaClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let (key, secret) = settings.require_alpaca_credentials()?;

        let base_url = settings.alpaca_base_url.clone().unwrap_or_else(|| {
            let url = if settings.alpaca_paper {
                PAPER_BASE_URL
            } else {
                LIVE_BASE_URL
            };
            url.to_string()
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            HeaderValue::from_str(key).context("ALPACA_API_KEY is not a valid header value")?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            HeaderValue::from_str(secret)
                .context("ALPACA_API_SECRET is not a valid header value")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build Alpaca http client")?;

        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    symbol: &'a str,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    qty: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notional: Option<Decimal>,
}

impl<'a> From<&'a MarketOrder> for OrderRequest<'a> {
    fn from(order: &'a MarketOrder) -> Self {
        let (qty, notional) = match order.size {
            OrderSize::Qty(q) => (Some(q), None),
            OrderSize::Notional(n) => (None, Some(n)),
        };
        Self {
            symbol: &order.symbol,
            side: order.side,
            order_type: "market",
            time_in_force: order.time_in_force,
            qty,
            notional,
        }
    }
}

#[async_trait::async_trait]
impl BrokerClient for AlpacaClient {
    async fn get_account(&self) -> Result<Account> {
        let res = self
            .http
            .get(self.url("/v2/account"))
            .send()
            .await
            .context("Alpaca account request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Alpaca account response")?;
        if !status.is_success() {
            anyhow::bail!("Alpaca account HTTP {status}: {text}");
        }

        serde_json::from_str(&text).context("failed to parse Alpaca account response")
    }

    async fn get_open_position(&self, symbol: &str) -> Result<Option<Position>> {
        let res = self
            .http
            .get(self.url(&format!("/v2/positions/{symbol}")))
            .send()
            .await
            .with_context(|| format!("Alpaca position request failed for {symbol}"))?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Alpaca position response")?;
        if !status.is_success() {
            anyhow::bail!("Alpaca position HTTP {status} for {symbol}: {text}");
        }

        let position =
            serde_json::from_str(&text).context("failed to parse Alpaca position response")?;
        Ok(Some(position))
    }

    async fn submit_market_order(&self, order: &MarketOrder) -> Result<()> {
        let req = OrderRequest::from(order);

        let res = self
            .http
            .post(self.url("/v2/orders"))
            .json(&req)
            .send()
            .await
            .with_context(|| format!("Alpaca order request failed for {}", order.symbol))?;

        let status = res.status();
        if !status.is_success() {
            let text = res
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            anyhow::bail!("Alpaca order HTTP {status} for {}: {text}", order.symbol);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_request_serializes_notional_without_qty() {
        let order = MarketOrder::notional("SPY", OrderSide::Buy, dec!(165.50));
        let json = serde_json::to_value(OrderRequest::from(&order)).unwrap();
        assert_eq!(json["symbol"], "SPY");
        assert_eq!(json["side"], "buy");
        assert_eq!(json["type"], "market");
        assert_eq!(json["time_in_force"], "day");
        assert_eq!(json["notional"], "165.50");
        assert!(json.get("qty").is_none());
    }

    #[test]
    fn order_request_serializes_qty_without_notional() {
        let order = MarketOrder::qty("SPY", OrderSide::Sell, dec!(3.2));
        let json = serde_json::to_value(OrderRequest::from(&order)).unwrap();
        assert_eq!(json["qty"], "3.2");
        assert!(json.get("notional").is_none());
    }
}
