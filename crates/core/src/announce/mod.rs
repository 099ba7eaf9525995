use crate::domain::event::RebalanceEvent;
use anyhow::Result;

pub mod spglobal;

/// Source of newly announced index additions. `Ok(None)` means the page had no
/// matching announcement this run; errors are fetch/parse failures and
/// propagate to the caller.
#[async_trait::async_trait]
pub trait AnnouncementSource: Send + Sync {
    async fn fetch_latest_event(&self) -> Result<Option<RebalanceEvent>>;
}

/// Turns a downloaded announcement document into rows of table cells. The
/// actual document decoder (PDF or otherwise) lives behind this seam.
pub trait TableExtractor: Send + Sync {
    fn extract_rows(&self, document: &[u8]) -> Result<Vec<Vec<String>>>;
}
