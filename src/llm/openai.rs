// OpenAI chat completions (streaming)
// API reference: https://platform.openai.com/docs/api-reference/chat/create

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::sse::decode_stream;
use super::{ChatCompleter, TokenStream};
use crate::config::OpenAIConfig;
use crate::embeddings::embedder::openai_error_message;
use crate::types::{AppError, AppResult, LLMMessage};

pub struct OpenAIChat {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [LLMMessage],
    stream: bool,
}

impl OpenAIChat {
    pub fn new(config: &OpenAIConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &OpenAIConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
        }
    }
}

#[async_trait]
impl ChatCompleter for OpenAIChat {
    async fn stream_chat(&self, messages: &[LLMMessage]) -> AppResult<TokenStream> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        debug!(model = %self.model, turns = messages.len(), "Opening completion stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::LLMApi(format!(
                "Completion API error ({}): {}",
                status,
                openai_error_message(&body)
            )));
        }

        Ok(decode_stream(response.bytes_stream()))
    }
}
