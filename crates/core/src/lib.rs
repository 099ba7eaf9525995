pub mod announce;
pub mod broker;
pub mod domain;
pub mod drift;
pub mod ladder;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use rust_decimal::Decimal;

    const DEFAULT_CAPITAL_USD: &str = "330";
    const DEFAULT_ADDITIONS_FILE: &str = "/var/lib/driftbot/additions.csv";
    const DEFAULT_PRESS_PAGE_URL: &str = "https://press.spglobal.com/press-releases";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub alpaca_api_key: Option<String>,
        pub alpaca_api_secret: Option<String>,
        pub alpaca_paper: bool,
        pub alpaca_base_url: Option<String>,
        pub capital_usd: Decimal,
        pub additions_file: String,
        pub press_page_url: String,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let alpaca_paper = std::env::var("ALPACA_PAPER")
                .map(|s| s.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true);

            let capital_usd = std::env::var("CAPITAL_USD")
                .unwrap_or_else(|_| DEFAULT_CAPITAL_USD.to_string())
                .trim()
                .parse::<Decimal>()
                .context("CAPITAL_USD must be a decimal dollar amount")?;
            anyhow::ensure!(
                capital_usd > Decimal::ZERO,
                "CAPITAL_USD must be positive (got {capital_usd})"
            );

            Ok(Self {
                alpaca_api_key: std::env::var("ALPACA_API_KEY").ok(),
                alpaca_api_secret: std::env::var("ALPACA_API_SECRET").ok(),
                alpaca_paper,
                alpaca_base_url: std::env::var("ALPACA_BASE_URL").ok(),
                capital_usd,
                additions_file: std::env::var("ADDITIONS_FILE")
                    .unwrap_or_else(|_| DEFAULT_ADDITIONS_FILE.to_string()),
                press_page_url: std::env::var("PRESS_PAGE_URL")
                    .unwrap_or_else(|_| DEFAULT_PRESS_PAGE_URL.to_string()),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_alpaca_credentials(&self) -> anyhow::Result<(&str, &str)> {
            let key = self
                .alpaca_api_key
                .as_deref()
                .context("ALPACA_API_KEY is required")?;
            let secret = self
                .alpaca_api_secret
                .as_deref()
                .context("ALPACA_API_SECRET is required")?;
            Ok((key, secret))
        }
    }

}
