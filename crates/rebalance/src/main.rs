use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use driftbot_core::announce::spglobal::{PressReleaseSource, TextTableExtractor};
use driftbot_core::announce::AnnouncementSource;
use driftbot_core::broker::alpaca::AlpacaClient;
use driftbot_core::config::Settings;
use driftbot_core::ladder::{self, LadderAction};
use driftbot_core::storage::additions::AdditionsStore;
use driftbot_core::storage::lock::{Acquired, RunLock};
use driftbot_core::time::ny_market::ny_date;

#[derive(Debug, Parser)]
#[command(name = "driftbot_rebalance")]
struct Args {
    /// Evaluate the ladder as of this date (YYYY-MM-DD) instead of today (NY).
    #[arg(long)]
    today: Option<String>,

    /// Skip the announcement fetch and work from the stored event only.
    #[arg(long)]
    skip_fetch: bool,

    /// Decide and log, but submit no orders and leave the state file alone.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let today = resolve_today(args.today.as_deref())?;

    settings.require_alpaca_credentials()?;

    let store = AdditionsStore::new(&settings.additions_file);
    let lock_path = store.path().with_extension("lock");
    let _run_lock = match RunLock::try_acquire(lock_path)? {
        Acquired::Yes(lock) => lock,
        Acquired::AlreadyHeld => {
            tracing::warn!(%today, "run lock not acquired; another run in progress");
            return Ok(());
        }
    };

    if !args.skip_fetch {
        let source = PressReleaseSource::new(
            settings.press_page_url.clone(),
            Box::new(TextTableExtractor),
            today,
        )?;
        refresh_pending_event(&source, &store, args.dry_run)
            .await
            .inspect_err(|err| {
                sentry_anyhow::capture_anyhow(err);
            })?;
    }

    let Some(event) = store.load()? else {
        tracing::info!(%today, "no pending addition list; nothing to do");
        return Ok(());
    };

    let action = ladder::decide(today, event.effective_date);
    tracing::info!(
        %today,
        effective_date = %event.effective_date,
        tickers = event.tickers().len(),
        ?action,
        "evaluated rebalance ladder"
    );

    match action {
        LadderAction::Hold => Ok(()),
        LadderAction::Buy => {
            let broker = AlpacaClient::from_settings(&settings)?;
            let report =
                ladder::execute_buy_leg(&broker, settings.capital_usd, &event, args.dry_run)
                    .await
                    .inspect_err(|err| {
                        sentry_anyhow::capture_anyhow(err);
                    })?;
            tracing::info!(
                bought = report.bought.len(),
                failed = report.failed.len(),
                per_ticker_notional = %report.per_ticker_notional,
                "buy leg complete"
            );
            Ok(())
        }
        LadderAction::Sell => {
            let broker = AlpacaClient::from_settings(&settings)?;
            let report = ladder::execute_sell_leg(&broker, &event, args.dry_run)
                .await
                .inspect_err(|err| {
                    sentry_anyhow::capture_anyhow(err);
                })?;
            tracing::info!(
                sold = report.sold.len(),
                no_position = report.no_position.len(),
                failed = report.failed.len(),
                "sell leg complete"
            );

            // The event is consumed once the exit has been attempted, even if
            // individual sells failed.
            if !args.dry_run {
                store.remove()?;
                tracing::info!(path = %store.path().display(), "removed consumed addition list");
            }
            Ok(())
        }
    }
}

/// A freshly parsed announcement unconditionally replaces whatever event is
/// stored, consumed or not. A dry run only logs what it would capture. Fetch
/// or parse failures propagate and abort the run; the stored event is left
/// untouched for the next invocation.
async fn refresh_pending_event(
    source: &dyn AnnouncementSource,
    store: &AdditionsStore,
    dry_run: bool,
) -> anyhow::Result<()> {
    match source.fetch_latest_event().await {
        Ok(Some(event)) => {
            if dry_run {
                tracing::info!(
                    effective_date = %event.effective_date,
                    tickers = ?event.tickers(),
                    "dry-run: would capture addition announcement"
                );
                return Ok(());
            }
            store.save(&event)?;
            tracing::info!(
                effective_date = %event.effective_date,
                tickers = ?event.tickers(),
                "captured addition announcement"
            );
            Ok(())
        }
        Ok(None) => {
            tracing::debug!("no addition announcement on the press page");
            Ok(())
        }
        Err(err) => Err(err.context("announcement fetch failed")),
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn resolve_today(today_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    match today_arg {
        Some(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("--today must be YYYY-MM-DD (got {s:?})")),
        None => Ok(ny_date(chrono::Utc::now())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftbot_core::domain::event::RebalanceEvent;

    struct FixedSource(RebalanceEvent);

    #[async_trait::async_trait]
    impl AnnouncementSource for FixedSource {
        async fn fetch_latest_event(&self) -> anyhow::Result<Option<RebalanceEvent>> {
            Ok(Some(self.0.clone()))
        }
    }

    fn event(tickers: &[&str]) -> RebalanceEvent {
        RebalanceEvent::new(
            chrono::NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            tickers.iter().map(|s| s.to_string()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn refresh_overwrites_stored_event() {
        let dir = tempfile::tempdir().unwrap();
        let store = AdditionsStore::new(dir.path().join("additions.csv"));
        store.save(&event(&["OLD"])).unwrap();

        let source = FixedSource(event(&["COIN", "DASH"]));
        refresh_pending_event(&source, &store, false).await.unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.tickers(), &["COIN", "DASH"]);
    }

    #[tokio::test]
    async fn dry_run_refresh_leaves_state_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = AdditionsStore::new(dir.path().join("additions.csv"));
        store.save(&event(&["OLD"])).unwrap();

        let source = FixedSource(event(&["COIN", "DASH"]));
        refresh_pending_event(&source, &store, true).await.unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.tickers(), &["OLD"]);
    }
}
