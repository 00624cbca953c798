// Context retrieval for the chat endpoint

use tracing::debug;

use crate::embeddings::Embedder;
use crate::storage::VectorStore;
use crate::types::{AppResult, ScoredMatch};

/// Separator placed between retrieved snippets in the context block.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

pub struct VectorSearch;

impl VectorSearch {
    /// Embed `question` and return the `top_k` nearest records.
    pub async fn search(
        embedder: &dyn Embedder,
        store: &dyn VectorStore,
        question: &str,
        top_k: usize,
    ) -> AppResult<Vec<ScoredMatch>> {
        let vector = embedder.embed_one(question).await?;
        let matches = store.query(&vector, top_k).await?;
        debug!(matches = matches.len(), top_k, "Vector search complete");
        Ok(matches)
    }

    /// Join match texts into one context block. Matches without text are skipped.
    pub fn build_context(matches: &[ScoredMatch]) -> String {
        matches
            .iter()
            .filter_map(ScoredMatch::text)
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER)
    }

    /// Search and collapse the hits into a context block (empty when nothing matched).
    pub async fn retrieve_context(
        embedder: &dyn Embedder,
        store: &dyn VectorStore,
        question: &str,
        top_k: usize,
    ) -> AppResult<String> {
        let matches = Self::search(embedder, store, question, top_k).await?;
        Ok(Self::build_context(&matches))
    }
}
