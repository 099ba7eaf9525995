use crate::broker::BrokerClient;
use crate::domain::order::{MarketOrder, OrderSide};
use rust_decimal::{Decimal, RoundingStrategy};

pub const DRIFT_SYMBOL: &str = "SPY";

/// What an invocation actually did, for the worker's log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftOutcome {
    Bought { notional: Decimal },
    Sold { qty: Decimal },
    NoCash,
    NoPosition,
    DryRun,
}

/// Buy leg: everything available up to the capital cap, as a notional order.
/// Sub-dollar amounts are below Alpaca's notional minimum and are skipped.
pub async fn run_buy(
    broker: &dyn BrokerClient,
    capital_cap: Decimal,
    dry_run: bool,
) -> anyhow::Result<DriftOutcome> {
    let account = broker.get_account().await?;
    // Round toward zero so the order never exceeds buying power or the cap.
    let notional = capital_cap
        .min(account.buying_power)
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    if notional < Decimal::ONE {
        return Ok(DriftOutcome::NoCash);
    }

    if dry_run {
        tracing::info!(%notional, symbol = DRIFT_SYMBOL, "dry-run: would buy");
        return Ok(DriftOutcome::DryRun);
    }

    let order = MarketOrder::notional(DRIFT_SYMBOL, OrderSide::Buy, notional);
    broker.submit_market_order(&order).await?;
    Ok(DriftOutcome::Bought { notional })
}

/// Sell leg: liquidate the whole overnight position, if one exists.
pub async fn run_sell(broker: &dyn BrokerClient, dry_run: bool) -> anyhow::Result<DriftOutcome> {
    let Some(position) = broker.get_open_position(DRIFT_SYMBOL).await? else {
        return Ok(DriftOutcome::NoPosition);
    };

    if dry_run {
        tracing::info!(qty = %position.qty, symbol = DRIFT_SYMBOL, "dry-run: would sell");
        return Ok(DriftOutcome::DryRun);
    }

    let order = MarketOrder::qty(DRIFT_SYMBOL, OrderSide::Sell, position.qty);
    broker.submit_market_order(&order).await?;
    Ok(DriftOutcome::Sold { qty: position.qty })
}
