use crate::broker::BrokerClient;
use crate::domain::event::RebalanceEvent;
use crate::domain::order::{MarketOrder, OrderSide};
use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

// Timing assumptions for the addition drift, all in calendar days relative to
// the inclusion effective date. The entry/exit offsets must stay distinct;
// `decide` checks the sell leg first so a collision would exit before
// re-entering.
pub const BUY_OFFSET_DAYS: i64 = 10;
pub const SELL_OFFSET_DAYS: i64 = 3;
pub const HEURISTIC_EFFECTIVE_DAYS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderAction {
    Buy,
    Sell,
    Hold,
}

/// Pure date ladder: enter ten days before inclusion, exit three days before.
pub fn decide(today: NaiveDate, effective_date: NaiveDate) -> LadderAction {
    if today == effective_date - Duration::days(SELL_OFFSET_DAYS) {
        LadderAction::Sell
    } else if today == effective_date - Duration::days(BUY_OFFSET_DAYS) {
        LadderAction::Buy
    } else {
        LadderAction::Hold
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyLegReport {
    pub per_ticker_notional: Decimal,
    pub bought: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellLegReport {
    pub sold: Vec<String>,
    pub no_position: Vec<String>,
    pub failed: Vec<String>,
}

/// Entry leg: split min(cap, buying power) equally across the pending tickers
/// as notional market buys. A failed submission is logged and skipped so the
/// rest of the basket still fills.
pub async fn execute_buy_leg(
    broker: &dyn BrokerClient,
    capital_cap: Decimal,
    event: &RebalanceEvent,
    dry_run: bool,
) -> anyhow::Result<BuyLegReport> {
    let account = broker.get_account().await?;
    let cash = capital_cap.min(account.buying_power);
    let count = Decimal::from(event.tickers().len() as u64);
    // Round toward zero so the allocation never breaches cash or the cap.
    let per_ticker = (cash / count).round_dp_with_strategy(2, RoundingStrategy::ToZero);

    let mut report = BuyLegReport {
        per_ticker_notional: per_ticker,
        bought: Vec::new(),
        failed: Vec::new(),
    };

    if per_ticker < Decimal::ONE {
        tracing::warn!(%cash, tickers = event.tickers().len(), "not enough cash for the buy leg");
        return Ok(report);
    }

    for ticker in event.tickers() {
        if dry_run {
            tracing::info!(%ticker, notional = %per_ticker, "dry-run: would buy");
            continue;
        }

        let order = MarketOrder::notional(ticker.clone(), OrderSide::Buy, per_ticker);
        match broker.submit_market_order(&order).await {
            Ok(()) => {
                tracing::info!(%ticker, notional = %per_ticker, "bought addition");
                report.bought.push(ticker.clone());
            }
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "buy submission failed; skipping ticker");
                report.failed.push(ticker.clone());
            }
        }
    }

    Ok(report)
}

/// Exit leg: liquidate whatever is actually held of each pending ticker.
/// Tickers with no open position are expected (a buy may have failed) and are
/// skipped; submission failures are logged and do not stop the leg. The caller
/// removes the persisted event afterwards regardless of individual outcomes.
pub async fn execute_sell_leg(
    broker: &dyn BrokerClient,
    event: &RebalanceEvent,
    dry_run: bool,
) -> anyhow::Result<SellLegReport> {
    let mut report = SellLegReport {
        sold: Vec::new(),
        no_position: Vec::new(),
        failed: Vec::new(),
    };

    for ticker in event.tickers() {
        let position = match broker.get_open_position(ticker).await {
            Ok(Some(position)) => position,
            Ok(None) => {
                tracing::info!(%ticker, "no open position; skipping");
                report.no_position.push(ticker.clone());
                continue;
            }
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "position lookup failed; skipping ticker");
                report.failed.push(ticker.clone());
                continue;
            }
        };

        if dry_run {
            tracing::info!(%ticker, qty = %position.qty, "dry-run: would sell");
            continue;
        }

        let order = MarketOrder::qty(ticker.clone(), OrderSide::Sell, position.qty);
        match broker.submit_market_order(&order).await {
            Ok(()) => {
                tracing::info!(%ticker, qty = %position.qty, "sold addition");
                report.sold.push(ticker.clone());
            }
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "sell submission failed; skipping ticker");
                report.failed.push(ticker.clone());
            }
        }
    }

    Ok(report)
}
