use crate::domain::event::RebalanceEvent;
use anyhow::Context;
use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Flat-file store for the single pending rebalance event.
///
/// Format: row 1 holds the effective date (YYYY-MM-DD), rows 2..n hold one
/// ticker each. The file is rewritten in full on every save and removed once
/// the sell leg has run.
#[derive(Debug, Clone)]
pub struct AdditionsStore {
    path: PathBuf,
}

impl AdditionsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the stored event. The write goes to a sibling temp file and
    /// is renamed into place so a reader never observes a torn file.
    pub fn save(&self, event: &RebalanceEvent) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path)
                .with_context(|| format!("failed to open {} for write", tmp_path.display()))?;
            writer
                .write_record([event.effective_date.format("%Y-%m-%d").to_string()])
                .context("failed to write effective date row")?;
            for ticker in event.tickers() {
                writer
                    .write_record([ticker.as_str()])
                    .with_context(|| format!("failed to write ticker row {ticker}"))?;
            }
            writer.flush().context("failed to flush additions file")?;
        }

        std::fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }

    /// Returns `None` when no event is pending (file absent).
    pub fn load(&self) -> anyhow::Result<Option<RebalanceEvent>> {
        let reader = match csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
        {
            Ok(reader) => reader,
            Err(err) => {
                if let csv::ErrorKind::Io(io_err) = err.kind() {
                    if io_err.kind() == ErrorKind::NotFound {
                        return Ok(None);
                    }
                }
                return Err(anyhow::Error::new(err)
                    .context(format!("failed to open {}", self.path.display())));
            }
        };

        let mut rows = reader.into_records();

        let date_row = rows
            .next()
            .with_context(|| format!("{} is empty", self.path.display()))?
            .context("failed to read effective date row")?;
        let date_cell = date_row
            .get(0)
            .with_context(|| format!("{} has a blank first row", self.path.display()))?;
        let effective_date = NaiveDate::parse_from_str(date_cell.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid effective date {date_cell:?}"))?;

        let mut tickers = Vec::new();
        for row in rows {
            let row = row.context("failed to read ticker row")?;
            if let Some(cell) = row.get(0) {
                tickers.push(cell.to_string());
            }
        }

        let event = RebalanceEvent::new(effective_date, tickers)
            .with_context(|| format!("{} holds no tickers", self.path.display()))?;
        Ok(Some(event))
    }

    /// Deletes the stored event. Missing file is fine (already consumed).
    pub fn remove(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("failed to remove {}", self.path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(tickers: &[&str]) -> RebalanceEvent {
        RebalanceEvent::new(
            NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            tickers.iter().map(|s| s.to_string()),
        )
        .unwrap()
    }

    #[test]
    fn round_trips_event_preserving_ticker_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = AdditionsStore::new(dir.path().join("additions.csv"));

        let saved = event(&["COIN", "DASH", "TPL"]);
        store.save(&saved).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn load_returns_none_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = AdditionsStore::new(dir.path().join("additions.csv"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_overwrites_prior_event() {
        let dir = tempfile::tempdir().unwrap();
        let store = AdditionsStore::new(dir.path().join("additions.csv"));

        store.save(&event(&["COIN", "DASH"])).unwrap();
        store.save(&event(&["TPL"])).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.tickers(), &["TPL"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = AdditionsStore::new(dir.path().join("additions.csv"));

        store.save(&event(&["COIN"])).unwrap();
        store.remove().unwrap();
        store.remove().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = AdditionsStore::new(dir.path().join("additions.csv"));
        store.save(&event(&["COIN"])).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["additions.csv".to_string()]);
    }
}
