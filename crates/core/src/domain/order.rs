use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    Day,
}

/// Sizing of a market order: share quantity or dollar notional, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSize {
    Qty(Decimal),
    Notional(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub size: OrderSize,
    pub time_in_force: TimeInForce,
}

impl MarketOrder {
    pub fn notional(symbol: impl Into<String>, side: OrderSide, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size: OrderSize::Notional(amount),
            time_in_force: TimeInForce::Day,
        }
    }

    pub fn qty(symbol: impl Into<String>, side: OrderSide, qty: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size: OrderSize::Qty(qty),
            time_in_force: TimeInForce::Day,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub buying_power: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub qty: Decimal,
}
