use crate::announce::{AnnouncementSource, TableExtractor};
use crate::domain::event::RebalanceEvent;
use crate::ladder::HEURISTIC_EFFECTIVE_DAYS;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::time::Duration as StdDuration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Scrapes the S&P Global press-release listing for an "S&P 500 ... Addition"
/// announcement, downloads the linked document, and extracts the added tickers
/// plus the inclusion effective date.
pub struct PressReleaseSource {
    http: reqwest::Client,
    page_url: String,
    extractor: Box<dyn TableExtractor>,
    today: NaiveDate,
}

impl PressReleaseSource {
    pub fn new(
        page_url: impl Into<String>,
        extractor: Box<dyn TableExtractor>,
        today: NaiveDate,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build press-release http client")?;

        Ok(Self {
            http,
            page_url: page_url.into(),
            extractor,
            today,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;
        anyhow::ensure!(status.is_success(), "GET {url} returned HTTP {status}");
        Ok(text)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = res.status();
        anyhow::ensure!(status.is_success(), "GET {url} returned HTTP {status}");
        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl AnnouncementSource for PressReleaseSource {
    async fn fetch_latest_event(&self) -> Result<Option<RebalanceEvent>> {
        let listing = self.fetch_text(&self.page_url).await?;

        let Some(link) = find_announcement_link(&listing) else {
            return Ok(None);
        };

        let doc_url = absolutize(&self.page_url, &link.href);
        tracing::info!(url = %doc_url, "found addition announcement");

        let document = self.fetch_bytes(&doc_url).await?;
        let rows = self
            .extractor
            .extract_rows(&document)
            .with_context(|| format!("failed to extract tables from {doc_url}"))?;

        let tickers = additions_from_rows(&rows);
        if tickers.is_empty() {
            tracing::warn!(url = %doc_url, "announcement document held no addition rows");
            return Ok(None);
        }

        let effective_date = effective_date_from_link(&doc_url, &link.text).unwrap_or_else(|| {
            let fallback = self.today + Duration::days(HEURISTIC_EFFECTIVE_DAYS);
            tracing::warn!(
                %fallback,
                "no effective date in announcement link; using heuristic"
            );
            fallback
        });

        let event = RebalanceEvent::new(effective_date, tickers)?;
        Ok(Some(event))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementLink {
    pub href: String,
    pub text: String,
}

/// First anchor on the page whose visible text looks like an S&P 500 addition
/// announcement. The entity-encoded ampersand is what the page actually serves.
pub fn find_announcement_link(html: &str) -> Option<AnnouncementLink> {
    let anchor = Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*"([^"]+)"[^>]*>(.*?)</a>"#)
        .expect("anchor regex is valid");
    let addition = Regex::new(r"(?i)S&(?:amp;)?P\s*500.*Addition").expect("addition regex is valid");

    for caps in anchor.captures_iter(html) {
        let text = strip_tags(&caps[2]);
        if addition.is_match(&text) {
            return Some(AnnouncementLink {
                href: caps[1].to_string(),
                text,
            });
        }
    }
    None
}

/// Rows whose first cell contains the literal "Addition"; the third cell holds
/// the ticker. Duplicates keep their first-seen slot only.
pub fn additions_from_rows(rows: &[Vec<String>]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for row in rows {
        let Some(kind) = row.first() else { continue };
        if !kind.contains("Addition") {
            continue;
        }
        let Some(ticker) = row.get(2) else { continue };
        let ticker = ticker.trim().to_string();
        if !ticker.is_empty() && seen.insert(ticker.clone()) {
            out.push(ticker);
        }
    }
    out
}

/// Parses a calendar date from the expression after the word "effective" in
/// the document URL or the link text, e.g. "... effective March 20, 2026" or
/// "...-effective-march-20-2026".
pub fn effective_date_from_link(url: &str, text: &str) -> Option<NaiveDate> {
    effective_date_from(url).or_else(|| effective_date_from(text))
}

fn effective_date_from(source: &str) -> Option<NaiveDate> {
    let tail = Regex::new(r"(?i)effective[\s_-]+(.+)$")
        .expect("effective regex is valid")
        .captures(source)?
        .get(1)?
        .as_str();

    // URLs spell the date with hyphens or percent-encoded spaces.
    let normalized = tail
        .replace("%20", " ")
        .replace(['-', '_', ','], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    for format in ["%B %d %Y", "%b %d %Y", "%Y %m %d", "%m %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Some(date);
        }
    }

    // Trailing file extensions or extra words: retry on shrinking prefixes.
    let words: Vec<&str> = normalized.split(' ').collect();
    for len in (2..words.len()).rev() {
        let prefix = words[..len].join(" ");
        for format in ["%B %d %Y", "%b %d %Y", "%Y %m %d", "%m %d %Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(&prefix, format) {
                return Some(date);
            }
        }
    }
    None
}

fn strip_tags(fragment: &str) -> String {
    let tags = Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid");
    tags.replace_all(fragment, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a possibly host-relative href against the listing page's origin.
fn absolutize(page_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    let origin = page_url
        .find("://")
        .and_then(|scheme_end| {
            page_url[scheme_end + 3..]
                .find('/')
                .map(|path_start| &page_url[..scheme_end + 3 + path_start])
        })
        .unwrap_or(page_url);

    format!("{}/{}", origin.trim_end_matches('/'), href.trim_start_matches('/'))
}

/// Decoder for plain-text and tab-separated announcement documents: one table
/// row per line, cells split on tabs or runs of two-plus spaces. PDF decoding
/// plugs in behind the same trait.
pub struct TextTableExtractor;

impl TableExtractor for TextTableExtractor {
    fn extract_rows(&self, document: &[u8]) -> Result<Vec<Vec<String>>> {
        let text = String::from_utf8_lossy(document);
        let splitter = Regex::new(r"\t|\s{2,}").expect("cell splitter regex is valid");

        let mut rows = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let cells: Vec<String> = splitter
                .split(line)
                .map(|cell| cell.trim().to_string())
                .filter(|cell| !cell.is_empty())
                .collect();
            if !cells.is_empty() {
                rows.push(cells);
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_addition_link_with_encoded_ampersand() {
        let html = r#"
            <ul>
              <li><a href="/releases/dividends-q1">Quarterly dividend report</a></li>
              <li><a href="/releases/spx-add-effective-march-20-2026">
                    <span>S&amp;P 500 Constituent Addition</span></a></li>
            </ul>"#;
        let link = find_announcement_link(html).unwrap();
        assert_eq!(link.href, "/releases/spx-add-effective-march-20-2026");
        assert_eq!(link.text, "S&amp;P 500 Constituent Addition");
    }

    #[test]
    fn ignores_pages_without_addition_links() {
        let html = r#"<a href="/releases/spx-removal">S&amp;P 500 Constituent Removal</a>"#;
        assert!(find_announcement_link(html).is_none());
    }

    #[test]
    fn extracts_third_cell_of_addition_rows_deduped() {
        let rows = vec![
            vec!["Action".into(), "Index".into(), "Ticker".into()],
            vec!["Addition".into(), "S&P 500".into(), "COIN".into()],
            vec!["Addition".into(), "S&P 500".into(), "DASH".into()],
            vec!["Addition".into(), "S&P 500".into(), "COIN".into()],
            vec!["Deletion".into(), "S&P 500".into(), "XYZ".into()],
        ];
        assert_eq!(additions_from_rows(&rows), vec!["COIN", "DASH"]);
    }

    #[test]
    fn skips_short_rows() {
        let rows = vec![vec!["Addition".into(), "S&P 500".into()]];
        assert!(additions_from_rows(&rows).is_empty());
    }

    #[test]
    fn parses_effective_date_from_hyphenated_url() {
        let date = effective_date_from_link(
            "https://press.example.com/spx-add-effective-march-20-2026",
            "S&P 500 Constituent Addition",
        )
        .unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 20).unwrap());
    }

    #[test]
    fn parses_effective_date_from_link_text() {
        let date = effective_date_from_link(
            "https://press.example.com/spx-add",
            "S&P 500 Constituent Addition effective March 20, 2026",
        )
        .unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 20).unwrap());
    }

    #[test]
    fn missing_effective_phrase_yields_none() {
        assert!(effective_date_from_link(
            "https://press.example.com/spx-add",
            "S&P 500 Constituent Addition"
        )
        .is_none());
    }

    #[test]
    fn text_extractor_splits_on_tabs_and_wide_gaps() {
        let doc = b"Action\tIndex\tTicker\nAddition   S&P 500   COIN\n\nAddition\tS&P 500\tDASH\n";
        let rows = TextTableExtractor.extract_rows(doc).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["Action".to_string(), "Index".into(), "Ticker".into()],
                vec!["Addition".to_string(), "S&P 500".into(), "COIN".into()],
                vec!["Addition".to_string(), "S&P 500".into(), "DASH".into()],
            ]
        );
    }

    #[test]
    fn absolutize_keeps_absolute_urls_and_resolves_relative_ones() {
        assert_eq!(
            absolutize("https://press.example.com/press-releases", "/releases/x"),
            "https://press.example.com/releases/x"
        );
        assert_eq!(
            absolutize("https://press.example.com/press-releases", "https://cdn.example.com/x.pdf"),
            "https://cdn.example.com/x.pdf"
        );
    }
}
