use crate::domain::order::{Account, MarketOrder, Position};
use anyhow::Result;

pub mod alpaca;
#[cfg(test)]
pub mod testing;

/// Brokerage operations the strategies consume. `get_open_position` returns
/// `Ok(None)` when no position is held; an `Err` is a real failure, never a
/// missing position.
#[async_trait::async_trait]
pub trait BrokerClient: Send + Sync {
    async fn get_account(&self) -> Result<Account>;

    async fn get_open_position(&self, symbol: &str) -> Result<Option<Position>>;

    async fn submit_market_order(&self, order: &MarketOrder) -> Result<()>;
}
