//! Ingestion Agent
//!
//! Turns a menu document into embedded records and swaps them into the
//! vector index. The swap is delete-all followed by upsert; there is no
//! rollback, so a failed upsert leaves the index empty. `ReplaceOutcome`
//! reports which phase failed so callers can tell.

use std::path::Path;

use tracing::{error, info, warn};

use crate::embeddings::{DocumentProcessor, Embedder, MenuRecord, SourceKind};
use crate::storage::VectorStore;
use crate::types::{AppError, AppResult, VectorRecord};

/// Result of a successful ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionReport {
    /// Nothing to ingest; the index was left untouched.
    Empty { message: String },
    /// The index now holds exactly `count` records from this run.
    Ingested { count: usize, message: String },
}

impl IngestionReport {
    pub fn message(&self) -> &str {
        match self {
            IngestionReport::Empty { message } | IngestionReport::Ingested { message, .. } => message,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            IngestionReport::Empty { .. } => 0,
            IngestionReport::Ingested { count, .. } => *count,
        }
    }
}

/// Outcome of a delete-all + upsert swap.
#[derive(Debug)]
pub enum ReplaceOutcome {
    Replaced { upserted: usize },
    /// Delete failed; the previous contents are still in place.
    DeleteFailed(AppError),
    /// Delete succeeded, upsert did not: the index is empty.
    UpsertFailed(AppError),
}

impl ReplaceOutcome {
    /// True when the old records are gone, whether or not the new ones landed.
    pub fn deleted(&self) -> bool {
        !matches!(self, ReplaceOutcome::DeleteFailed(_))
    }

    pub fn into_result(self) -> AppResult<usize> {
        match self {
            ReplaceOutcome::Replaced { upserted } => Ok(upserted),
            ReplaceOutcome::DeleteFailed(e) => {
                Err(AppError::Ingestion(format!("delete-all failed: {}", e)))
            }
            ReplaceOutcome::UpsertFailed(e) => Err(AppError::Ingestion(format!(
                "upsert failed after delete-all, index is empty: {}",
                e
            ))),
        }
    }
}

/// Clear the index, then write `records`.
pub async fn replace_all(store: &dyn VectorStore, records: &[VectorRecord]) -> ReplaceOutcome {
    if let Err(e) = store.delete_all().await {
        error!(error = %e, "Delete-all failed, index left unchanged");
        return ReplaceOutcome::DeleteFailed(e);
    }

    info!(records = records.len(), "Index cleared, upserting new records");
    match store.upsert(records).await {
        Ok(upserted) => ReplaceOutcome::Replaced { upserted },
        Err(e) => {
            error!(error = %e, "Upsert failed after delete-all, index is empty");
            ReplaceOutcome::UpsertFailed(e)
        }
    }
}

pub struct IngestionAgent<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
}

impl<'a> IngestionAgent<'a> {
    pub fn new(embedder: &'a dyn Embedder, store: &'a dyn VectorStore) -> Self {
        Self { embedder, store }
    }

    /// Read, parse and ingest a menu file.
    pub async fn ingest_file(&self, path: &Path, kind: SourceKind) -> AppResult<IngestionReport> {
        info!(path = %path.display(), kind = kind.label(), "Starting ingestion");
        let bytes = tokio::fs::read(path).await?;

        // PDF text extraction is CPU-bound.
        let records = match kind {
            SourceKind::Csv => DocumentProcessor::parse_csv(&bytes)?,
            SourceKind::Pdf => tokio::task::spawn_blocking(move || DocumentProcessor::parse_pdf(&bytes))
                .await
                .map_err(|e| AppError::Internal(format!("PDF parsing task failed: {}", e)))??,
        };

        self.ingest_records(&records, kind).await
    }

    /// Embed `records` in one batch and swap them into the index.
    pub async fn ingest_records(
        &self,
        records: &[MenuRecord],
        kind: SourceKind,
    ) -> AppResult<IngestionReport> {
        if records.is_empty() {
            warn!(kind = kind.label(), "No menu records found, index left untouched");
            return Ok(IngestionReport::Empty {
                message: format!("{} file was empty or no data could be processed.", kind.label()),
            });
        }

        let texts: Vec<String> = records.iter().map(|r| r.structured_text(kind)).collect();

        let vectors = self.embedder.embed(&texts).await.map_err(|e| {
            error!(error = %e, "Embedding request failed during ingestion");
            AppError::Ingestion(e.to_string())
        })?;

        let vector_records = Self::build_vector_records(texts, vectors, kind)?;
        info!(
            count = vector_records.len(),
            kind = kind.label(),
            "Menu data transformed into vector records"
        );

        let count = vector_records.len();
        replace_all(self.store, &vector_records).await.into_result()?;

        info!(count, "Ingestion complete");
        Ok(IngestionReport::Ingested {
            count,
            message: format!("Ingested {} records from {}.", count, kind.label()),
        })
    }

    /// Pair texts with their embeddings; ids are assigned 1..=N in input order.
    pub fn build_vector_records(
        texts: Vec<String>,
        vectors: Vec<Vec<f32>>,
        kind: SourceKind,
    ) -> AppResult<Vec<VectorRecord>> {
        if texts.len() != vectors.len() {
            return Err(AppError::Ingestion(format!(
                "got {} embeddings for {} records",
                vectors.len(),
                texts.len()
            )));
        }

        Ok(texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, values))| VectorRecord {
                id: kind.record_id(i + 1),
                values,
                metadata: serde_json::json!({ "text": text, "chunk_text": text }),
            })
            .collect())
    }
}
