// In-process stand-ins for the embedding service, vector index and completion model.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use kopakopi::embeddings::Embedder;
use kopakopi::llm::{ChatCompleter, TokenStream};
use kopakopi::storage::VectorStore;
use kopakopi::types::{AppError, AppResult, IdPage, LLMMessage, ScoredMatch, VectorRecord};
use kopakopi::{AppState, Config};

pub const ADMIN_PASSWORD: &str = "captain-test";

#[derive(Default)]
pub struct CountingEmbedder {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every later `embed` call errors.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, inputs: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Embedding("quota exceeded".into()));
        }
        Ok(inputs.iter().map(|s| vec![s.len() as f32, 1.0]).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Upsert,
    Delete,
    List,
    Fetch,
}

/// Keeps records in insertion order. `query` returns the first `top_k`
/// records; ranking is the real index's job and is not modelled here.
pub struct MemoryStore {
    pub records: Mutex<Vec<VectorRecord>>,
    pub page_size: usize,
    pub mutations: AtomicUsize,
    pub failing: Mutex<Vec<StoreOp>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_page_size(100)
    }
}

impl MemoryStore {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            page_size,
            mutations: AtomicUsize::new(0),
            failing: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, records: Vec<VectorRecord>) {
        self.records.lock().unwrap().extend(records);
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.lock().unwrap().iter().map(|r| r.id.clone()).collect()
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Make every later call of `op` error.
    pub fn fail_on(&self, op: StoreOp) {
        self.failing.lock().unwrap().push(op);
    }

    fn check(&self, op: StoreOp) -> AppResult<()> {
        if self.failing.lock().unwrap().contains(&op) {
            return Err(AppError::VectorStore(format!("{:?} unavailable", op)));
        }
        Ok(())
    }
}

pub fn text_record(id: &str, text: &str) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        values: vec![0.0, 1.0],
        metadata: serde_json::json!({ "text": text, "chunk_text": text }),
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, records: &[VectorRecord]) -> AppResult<usize> {
        self.check(StoreOp::Upsert)?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.records.lock().unwrap();
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(records.len())
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .take(top_k)
            .map(|r| ScoredMatch {
                id: r.id.clone(),
                score: 1.0,
                metadata: r.metadata.clone(),
            })
            .collect())
    }

    async fn delete_all(&self) -> AppResult<()> {
        self.check(StoreOp::Delete)?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().clear();
        Ok(())
    }

    async fn list_page(&self, token: Option<&str>) -> AppResult<IdPage> {
        self.check(StoreOp::List)?;
        let start: usize = match token {
            Some(t) => t
                .parse()
                .map_err(|_| AppError::VectorStore(format!("bad token {}", t)))?,
            None => 0,
        };
        let stored = self.records.lock().unwrap();
        let end = (start + self.page_size).min(stored.len());
        Ok(IdPage {
            ids: stored[start..end].iter().map(|r| r.id.clone()).collect(),
            next: (end < stored.len()).then(|| end.to_string()),
        })
    }

    async fn fetch(&self, ids: &[String]) -> AppResult<Vec<VectorRecord>> {
        self.check(StoreOp::Fetch)?;
        let stored = self.records.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| stored.iter().find(|r| &r.id == id).cloned())
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// What the fake model does when asked to complete.
#[derive(Clone)]
pub enum Script {
    Answer(Vec<&'static str>),
    /// Refuse before producing anything.
    FailToOpen,
    /// Emit these fragments, then fail.
    FailAfter(Vec<&'static str>),
}

pub struct ScriptedCompleter {
    pub script: Script,
    pub seen: Mutex<Vec<Vec<LLMMessage>>>,
}

impl ScriptedCompleter {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatCompleter for ScriptedCompleter {
    async fn stream_chat(&self, messages: &[LLMMessage]) -> AppResult<TokenStream> {
        self.seen.lock().unwrap().push(messages.to_vec());
        match &self.script {
            Script::FailToOpen => Err(AppError::LLMApi("model unavailable".into())),
            Script::Answer(parts) => {
                let items: Vec<AppResult<String>> = parts.iter().map(|p| Ok(p.to_string())).collect();
                Ok(futures::stream::iter(items).boxed())
            }
            Script::FailAfter(parts) => {
                let mut items: Vec<AppResult<String>> = parts.iter().map(|p| Ok(p.to_string())).collect();
                items.push(Err(AppError::LLMApi("connection reset".into())));
                Ok(futures::stream::iter(items).boxed())
            }
        }
    }
}

pub struct Harness {
    pub state: AppState,
    pub embedder: Arc<CountingEmbedder>,
    pub store: Arc<MemoryStore>,
    pub completer: Arc<ScriptedCompleter>,
    pub upload_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(store: MemoryStore, script: Script) -> Self {
        let upload_dir = tempfile::TempDir::new().unwrap();
        let config = Config::for_testing(ADMIN_PASSWORD, upload_dir.path().to_str().unwrap());
        let embedder = Arc::new(CountingEmbedder::default());
        let store = Arc::new(store);
        let completer = Arc::new(ScriptedCompleter::new(script));
        let state = AppState::new(config, embedder.clone(), store.clone(), completer.clone());
        Self {
            state,
            embedder,
            store,
            completer,
            upload_dir,
        }
    }

    pub fn router(&self) -> axum::Router {
        kopakopi::create_router(self.state.clone())
    }

    pub fn upload_dir_is_empty(&self) -> bool {
        std::fs::read_dir(self.upload_dir.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}

pub const BOUNDARY: &str = "----kopakopi-test-boundary";

/// Hand-built multipart body. `file` is `(filename, contents)`.
pub fn multipart_body(password: Option<&str>, file: Option<(&str, &str)>) -> Vec<u8> {
    let mut body = String::new();
    if let Some((filename, contents)) = file {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"knowledgeFile\"; filename=\"{}\"\r\nContent-Type: text/csv\r\n\r\n{}\r\n",
            BOUNDARY, filename, contents
        ));
    }
    if let Some(password) = password {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\n{}\r\n",
            BOUNDARY, password
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body.into_bytes()
}
