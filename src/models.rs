use std::sync::Arc;

use crate::config::Config;
use crate::embeddings::Embedder;
use crate::llm::ChatCompleter;
use crate::storage::VectorStore;

/// Process-wide handles, built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub completer: Arc<dyn ChatCompleter>,
}

impl AppState {
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        completer: Arc<dyn ChatCompleter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            embedder,
            store,
            completer,
        }
    }
}

/// Who wrote a chat turn. The UI labels the bot `"ai"`; anything that is not
/// `"user"` is treated as the assistant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[default]
    #[serde(other)]
    Assistant,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
}

// API Request/Response types

#[derive(Debug, Default, serde::Deserialize)]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "text_or_none")]
    pub question: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Accept any JSON value; only a string counts as present.
fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    })
}

#[derive(Debug, serde::Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub details: String,
}

#[derive(Debug, serde::Serialize)]
pub struct DataResponse {
    pub message: String,
    pub data: Vec<serde_json::Value>,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub vector_store: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_accepts_ui_labels() {
        let history: Vec<ChatMessage> = serde_json::from_str(
            r#"[{"sender":"user","text":"hi"},{"sender":"ai","text":"hello"},{"sender":"assistant","text":"again"}]"#,
        )
        .unwrap();
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[1].sender, Sender::Assistant);
        assert_eq!(history[2].sender, Sender::Assistant);
    }

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(request.question.is_none());
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_history_entry_without_sender_is_assistant() {
        let history: Vec<ChatMessage> =
            serde_json::from_str(r#"[{"text":"Welcome!"},{"sender":"user","text":"hi"}]"#).unwrap();
        assert_eq!(history[0].sender, Sender::Assistant);
        assert_eq!(history[1].sender, Sender::User);
    }

    #[test]
    fn test_non_string_question_is_absent() {
        let request: ChatRequest = serde_json::from_str(r#"{"question":42}"#).unwrap();
        assert!(request.question.is_none());
        let request: ChatRequest = serde_json::from_str(r#"{"question":null}"#).unwrap();
        assert!(request.question.is_none());
        let request: ChatRequest = serde_json::from_str(r#"{"question":"Latte?"}"#).unwrap();
        assert_eq!(request.question.as_deref(), Some("Latte?"));
    }
}
