use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use driftbot_core::broker::alpaca::AlpacaClient;
use driftbot_core::drift::{self, DriftOutcome, DRIFT_SYMBOL};
use driftbot_core::time::ny_market::{drift_decision, DriftDecision};

#[derive(Debug, Parser)]
#[command(name = "driftbot_overnight")]
struct Args {
    /// Evaluate the trade window at this instant (RFC 3339) instead of now.
    #[arg(long)]
    at: Option<String>,

    /// Decide and log, but submit no orders.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = driftbot_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let now = resolve_now(args.at.as_deref())?;

    // Missing credentials must exit non-zero even on an off-schedule minute.
    settings.require_alpaca_credentials()?;

    let decision = drift_decision(now);
    tracing::info!(%now, ?decision, "evaluated drift window");

    if let DriftDecision::Skip(reason) = decision {
        tracing::info!(?reason, "not a scheduled trade minute; nothing to do");
        return Ok(());
    }

    let broker = AlpacaClient::from_settings(&settings)?;

    let result = if matches!(decision, DriftDecision::Buy) {
        drift::run_buy(&broker, settings.capital_usd, args.dry_run).await
    } else {
        drift::run_sell(&broker, args.dry_run).await
    };

    match result {
        Ok(DriftOutcome::Bought { notional }) => {
            tracing::info!(%notional, symbol = DRIFT_SYMBOL, "bought into the close");
        }
        Ok(DriftOutcome::Sold { qty }) => {
            tracing::info!(%qty, symbol = DRIFT_SYMBOL, "sold at the open");
        }
        Ok(DriftOutcome::NoCash) => {
            tracing::info!("no cash available to buy");
        }
        Ok(DriftOutcome::NoPosition) => {
            tracing::info!(symbol = DRIFT_SYMBOL, "no position to sell");
        }
        Ok(DriftOutcome::DryRun) => {
            tracing::info!("dry-run complete; no order submitted");
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    }

    Ok(())
}

fn init_sentry(settings: &driftbot_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn resolve_now(at_arg: Option<&str>) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    match at_arg {
        Some(s) => Ok(chrono::DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("--at must be RFC 3339 (got {s:?})"))?
            .with_timezone(&chrono::Utc)),
        None => Ok(chrono::Utc::now()),
    }
}
