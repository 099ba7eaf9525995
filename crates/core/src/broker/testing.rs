use crate::broker::BrokerClient;
use crate::domain::order::{Account, MarketOrder, Position};
use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// In-memory broker for strategy tests: fixed buying power, seeded positions,
/// recorded submissions, optional per-symbol submit failures.
#[derive(Debug, Default)]
pub struct MockBroker {
    buying_power: Decimal,
    positions: BTreeMap<String, Position>,
    failing_symbols: BTreeSet<String>,
    submitted: Mutex<Vec<MarketOrder>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buying_power(mut self, buying_power: Decimal) -> Self {
        self.buying_power = buying_power;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.positions.insert(position.symbol.clone(), position);
        self
    }

    pub fn failing_submit_for(mut self, symbol: &str) -> Self {
        self.failing_symbols.insert(symbol.to_string());
        self
    }

    pub fn submitted(&self) -> Vec<MarketOrder> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BrokerClient for MockBroker {
    async fn get_account(&self) -> Result<Account> {
        Ok(Account {
            buying_power: self.buying_power,
        })
    }

    async fn get_open_position(&self, symbol: &str) -> Result<Option<Position>> {
        Ok(self.positions.get(symbol).cloned())
    }

    async fn submit_market_order(&self, order: &MarketOrder) -> Result<()> {
        if self.failing_symbols.contains(&order.symbol) {
            anyhow::bail!("injected submit failure for {}", order.symbol);
        }
        self.submitted.lock().unwrap().push(order.clone());
        Ok(())
    }
}
