use anyhow::ensure;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// One announced batch of index additions. Only a single event is ever pending
/// at a time; a newly parsed announcement overwrites the stored one wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceEvent {
    pub effective_date: NaiveDate,
    tickers: Vec<String>,
}

impl RebalanceEvent {
    /// Builds an event from raw ticker rows: trims, drops empties, dedupes
    /// while keeping first-seen order.
    pub fn new(
        effective_date: NaiveDate,
        tickers: impl IntoIterator<Item = String>,
    ) -> anyhow::Result<Self> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for raw in tickers {
            let ticker = raw.trim().to_string();
            if ticker.is_empty() {
                continue;
            }
            if seen.insert(ticker.clone()) {
                out.push(ticker);
            }
        }
        ensure!(!out.is_empty(), "rebalance event must have at least one ticker");

        Ok(Self {
            effective_date,
            tickers: out,
        })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }
}
