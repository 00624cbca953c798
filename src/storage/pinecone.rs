// Pinecone data-plane client
// API reference: https://docs.pinecone.io/reference/api/data-plane
//
// Only the five calls the service uses are wrapped: upsert, query,
// delete-all, list (paginated ids) and fetch.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::VectorStore;
use crate::config::PineconeConfig;
use crate::types::{AppError, AppResult, IdPage, ScoredMatch, VectorRecord};

/// Pinecone rejects upsert requests above 2MB; 100 vectors of 1024 floats stays well under.
pub const UPSERT_BATCH_SIZE: usize = 100;

pub struct PineconeStore {
    client: Client,
    api_key: String,
    host: String,
    namespace: Option<String>,
    api_version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredMatch>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    delete_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedId>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedId {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    next: Option<String>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, VectorRecord>,
}

impl PineconeStore {
    pub fn new(config: &PineconeConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &PineconeConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            host: normalize_host(&config.index_host),
            namespace: config.namespace.clone(),
            api_version: config.api_version.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> AppResult<Response> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Pinecone {} request failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore(format!(
                "Pinecone {} error ({}): {}",
                operation, status, body
            )));
        }
        Ok(response)
    }

    async fn upsert_batch(&self, batch: &[VectorRecord]) -> AppResult<usize> {
        let body = UpsertRequest {
            vectors: batch,
            namespace: self.namespace.as_deref(),
        };
        let response = self
            .send("upsert", self.client.post(self.url("/vectors/upsert")).json(&body))
            .await?;
        let parsed: UpsertResponse = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to parse Pinecone upsert response: {}", e)))?;
        Ok(parsed.upserted_count)
    }
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn upsert(&self, records: &[VectorRecord]) -> AppResult<usize> {
        let mut written = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            written += self.upsert_batch(batch).await?;
            debug!(written, total = records.len(), "Upserted batch to Pinecone");
        }
        Ok(written)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };
        let response = self
            .send("query", self.client.post(self.url("/query")).json(&body))
            .await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to parse Pinecone query response: {}", e)))?;
        Ok(parsed.matches)
    }

    async fn delete_all(&self) -> AppResult<()> {
        let body = DeleteRequest {
            delete_all: true,
            namespace: self.namespace.as_deref(),
        };
        self.send("delete", self.client.post(self.url("/vectors/delete")).json(&body))
            .await?;
        Ok(())
    }

    async fn list_page(&self, token: Option<&str>) -> AppResult<IdPage> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(namespace) = self.namespace.as_deref() {
            params.push(("namespace", namespace));
        }
        if let Some(token) = token {
            params.push(("paginationToken", token));
        }
        let response = self
            .send("list", self.client.get(self.url("/vectors/list")).query(&params))
            .await?;
        let parsed: ListResponse = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to parse Pinecone list response: {}", e)))?;

        Ok(IdPage {
            ids: parsed.vectors.into_iter().map(|v| v.id).collect(),
            next: parsed
                .pagination
                .and_then(|p| p.next)
                .filter(|next| !next.is_empty()),
        })
    }

    async fn fetch(&self, ids: &[String]) -> AppResult<Vec<VectorRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        if let Some(namespace) = self.namespace.as_deref() {
            params.push(("namespace", namespace));
        }
        let response = self
            .send("fetch", self.client.get(self.url("/vectors/fetch")).query(&params))
            .await?;
        let mut parsed: FetchResponse = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to parse Pinecone fetch response: {}", e)))?;

        // The response is keyed by id; hand records back in request order.
        Ok(ids.iter().filter_map(|id| parsed.vectors.remove(id)).collect())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(host: &str) -> PineconeConfig {
        PineconeConfig {
            api_key: "pc-test".to_string(),
            index_host: host.to_string(),
            namespace: None,
            api_version: "2024-07".to_string(),
        }
    }

    fn record(id: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values: vec![0.1, 0.2],
            metadata: serde_json::json!({ "text": id }),
        }
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("idx-abc.svc.pinecone.io"), "https://idx-abc.svc.pinecone.io");
        assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
    }

    #[tokio::test]
    async fn test_upsert_splits_into_batches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/vectors/upsert")
            .match_header("api-key", "pc-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"upsertedCount":100}"#)
            .expect(3)
            .create_async()
            .await;

        let store = PineconeStore::new(&config(&server.url()));
        let records: Vec<VectorRecord> = (1..=250).map(|i| record(&format!("menu-csv-{}", i))).collect();
        let written = store.upsert(&records).await.unwrap();

        mock.assert_async().await;
        assert_eq!(written, 300);
    }

    #[tokio::test]
    async fn test_query_sends_top_k_and_parses_matches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "topK": 30,
                "includeMetadata": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"matches":[{"id":"menu-csv-1","score":0.92,"metadata":{"text":"Menu Name: Latte"}}],"namespace":""}"#,
            )
            .create_async()
            .await;

        let store = PineconeStore::new(&config(&server.url()));
        let matches = store.query(&[0.5, 0.5], 30).await.unwrap();

        mock.assert_async().await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text(), Some("Menu Name: Latte"));
    }

    #[tokio::test]
    async fn test_delete_all_sends_flag() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/vectors/delete")
            .match_body(Matcher::Json(serde_json::json!({ "deleteAll": true })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let store = PineconeStore::new(&config(&server.url()));
        store.delete_all().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_page_passes_token_and_reads_next() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vectors/list")
            .match_query(Matcher::UrlEncoded("paginationToken".into(), "tok-1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"vectors":[{"id":"a"},{"id":"b"}],"pagination":{"next":"tok-2"}}"#)
            .create_async()
            .await;

        let store = PineconeStore::new(&config(&server.url()));
        let page = store.list_page(Some("tok-1")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(page.next.as_deref(), Some("tok-2"));
    }

    #[tokio::test]
    async fn test_list_last_page_has_no_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/vectors/list")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"vectors":[{"id":"z"}]}"#)
            .create_async()
            .await;

        let store = PineconeStore::new(&config(&server.url()));
        let page = store.list_page(None).await.unwrap();
        assert_eq!(page.ids.len(), 1);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_fetch_returns_request_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/vectors/fetch")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"vectors":{
                    "b":{"id":"b","values":[],"metadata":{"text":"B"}},
                    "a":{"id":"a","values":[],"metadata":{"text":"A"}}
                },"namespace":""}"#,
            )
            .create_async()
            .await;

        let store = PineconeStore::new(&config(&server.url()));
        let ids = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
        let records = store.fetch(&ids).await.unwrap();

        let texts: Vec<_> = records.iter().filter_map(|r| r.text()).collect();
        assert_eq!(texts, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/vectors/delete")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let store = PineconeStore::new(&config(&server.url()));
        let err = store.delete_all().await.unwrap_err();
        match err {
            AppError::VectorStore(msg) => {
                assert!(msg.contains("503"));
                assert!(msg.contains("unavailable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
