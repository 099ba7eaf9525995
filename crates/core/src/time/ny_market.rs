use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::America::New_York;

// NYSE regular session is 09:30-16:00 ET. The drift trade fires on exactly one
// minute per leg; a missed invocation is a missed trade, not a catch-up.
const BUY_HOUR_ET: u32 = 15;
const BUY_MINUTE_ET: u32 = 59;
const SELL_HOUR_ET: u32 = 9;
const SELL_MINUTE_ET: u32 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftDecision {
    Buy,
    Sell,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Weekend,
    OffScheduleMinute,
}

/// Pure time predicate for the close-to-open drift: given the current instant,
/// picks the leg to run this invocation. Seconds are ignored so a scheduler
/// firing anywhere inside the trade minute still matches.
pub fn drift_decision(now_utc: DateTime<Utc>) -> DriftDecision {
    let now_ny = now_utc.with_timezone(&New_York);

    if matches!(now_ny.weekday(), Weekday::Sat | Weekday::Sun) {
        return DriftDecision::Skip(SkipReason::Weekend);
    }

    match (now_ny.hour(), now_ny.minute()) {
        (BUY_HOUR_ET, BUY_MINUTE_ET) => DriftDecision::Buy,
        (SELL_HOUR_ET, SELL_MINUTE_ET) => DriftDecision::Sell,
        _ => DriftDecision::Skip(SkipReason::OffScheduleMinute),
    }
}

/// Today's calendar date on the New York wall clock.
pub fn ny_date(now_utc: DateTime<Utc>) -> chrono::NaiveDate {
    now_utc.with_timezone(&New_York).date_naive()
}
