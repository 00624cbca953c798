// Bulk export of stored record metadata

use tracing::{debug, info, warn};

use crate::storage::VectorStore;
use crate::types::AppResult;

/// Ids per fetch call.
pub const FETCH_BATCH_SIZE: usize = 1000;

pub struct DataExporter<'a> {
    store: &'a dyn VectorStore,
}

impl<'a> DataExporter<'a> {
    pub fn new(store: &'a dyn VectorStore) -> Self {
        Self { store }
    }

    /// Walk every listing page and return all ids in listing order.
    pub async fn collect_ids(&self) -> AppResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.store.list_page(token.as_deref()).await?;
            pages += 1;
            ids.extend(page.ids);

            match page.next {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    warn!(token = %next, "Store repeated its pagination token, stopping");
                    break;
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(pages, ids = ids.len(), "Listed record ids");
        Ok(ids)
    }

    /// Metadata of every stored record, flattened in listing order.
    pub async fn export_metadata(&self) -> AppResult<Vec<serde_json::Value>> {
        let ids = self.collect_ids().await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        info!(count = ids.len(), "Fetching record metadata");
        let mut metadata = Vec::with_capacity(ids.len());
        for batch in ids.chunks(FETCH_BATCH_SIZE) {
            let records = self.store.fetch(batch).await?;
            metadata.extend(records.into_iter().map(|r| r.metadata));
        }
        Ok(metadata)
    }
}
