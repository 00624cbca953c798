// Vector storage layer (Pinecone data plane)

pub mod pinecone;

pub use pinecone::*;

use async_trait::async_trait;

use crate::types::{AppResult, IdPage, ScoredMatch, VectorRecord};

/// Operations the service needs from the external vector index.
///
/// Every call is attempted exactly once; implementations do not retry.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records keyed by id. Returns the number written.
    async fn upsert(&self, records: &[VectorRecord]) -> AppResult<usize>;

    /// Nearest neighbours of `vector`, best first, with metadata.
    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>>;

    /// Remove every record in the index (or configured namespace).
    async fn delete_all(&self) -> AppResult<()>;

    /// One page of ids. `token` is the opaque continuation from the previous page.
    async fn list_page(&self, token: Option<&str>) -> AppResult<IdPage>;

    /// Records for `ids`, in the order requested. Unknown ids are skipped.
    async fn fetch(&self, ids: &[String]) -> AppResult<Vec<VectorRecord>>;

    /// Short name used in logs and the health endpoint.
    fn name(&self) -> &str {
        "vector-store"
    }
}
