//! Reply Agent
//!
//! Answers a menu question: retrieves context from the vector index, builds
//! the prompt from context plus the caller's history, and streams the
//! completion back fragment by fragment.

use std::convert::Infallible;

use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use tracing::{debug, info};

use crate::embeddings::VectorSearch;
use crate::llm::TokenStream;
use crate::models::{AppState, ChatMessage, Sender};
use crate::types::{AppError, AppResult, LLMMessage};

pub const SYSTEM_PROMPT: &str = "You are a friendly and helpful AI assistant for \"The Coffee Shop\". \
Answer questions based on the provided CONTEXT and the ongoing conversation history.";

/// A reply that has cleared the point where failure can still be reported.
pub enum ReplyStream {
    /// At least one fragment exists; the caller can commit to a streamed response.
    Streaming { first: String, rest: TokenStream },
    /// The model finished without producing any text.
    Finished,
}

/// How a forwarded stream ended. Only visible server-side.
#[derive(Debug)]
pub enum StreamEnd {
    Completed { fragments: usize, bytes: usize },
    /// Failed after the first byte went out; the client sees a truncated answer.
    Failed {
        error: AppError,
        fragments: usize,
        bytes: usize,
    },
}

struct Forward<F> {
    rest: TokenStream,
    fragments: usize,
    bytes: usize,
    on_end: Option<F>,
}

impl<F: FnOnce(StreamEnd)> Forward<F> {
    fn end(&mut self, error: Option<AppError>) {
        let end = match error {
            None => StreamEnd::Completed {
                fragments: self.fragments,
                bytes: self.bytes,
            },
            Some(error) => StreamEnd::Failed {
                error,
                fragments: self.fragments,
                bytes: self.bytes,
            },
        };
        if let Some(on_end) = self.on_end.take() {
            on_end(end);
        }
    }
}

impl ReplyStream {
    /// Body stream that sends `first`, then each later fragment as it arrives.
    /// A later error stops the body; `on_end` is told how the stream ended.
    pub fn forward<F>(self, on_end: F) -> BoxStream<'static, Result<Bytes, Infallible>>
    where
        F: FnOnce(StreamEnd) + Send + 'static,
    {
        let (first, rest) = match self {
            ReplyStream::Streaming { first, rest } => (first, rest),
            ReplyStream::Finished => {
                on_end(StreamEnd::Completed {
                    fragments: 0,
                    bytes: 0,
                });
                return futures::stream::empty().boxed();
            }
        };

        let state = Forward {
            rest,
            fragments: 1,
            bytes: first.len(),
            on_end: Some(on_end),
        };

        let tail = futures::stream::unfold(state, |mut state| async move {
            match state.rest.next().await {
                Some(Ok(fragment)) => {
                    state.fragments += 1;
                    state.bytes += fragment.len();
                    Some((Ok::<_, Infallible>(Bytes::from(fragment)), state))
                }
                Some(Err(error)) => {
                    state.end(Some(error));
                    None
                }
                None => {
                    state.end(None);
                    None
                }
            }
        });

        futures::stream::once(async move { Ok::<_, Infallible>(Bytes::from(first)) })
            .chain(tail)
            .boxed()
    }
}

pub struct ReplyAgent;

impl ReplyAgent {
    /// Map caller history to model turns, order preserved.
    pub fn history_turns(history: &[ChatMessage]) -> Vec<LLMMessage> {
        history
            .iter()
            .map(|msg| match msg.sender {
                Sender::User => LLMMessage::user(&msg.text),
                Sender::Assistant => LLMMessage::assistant(&msg.text),
            })
            .collect()
    }

    pub fn create_question_prompt(question: &str, context: &str) -> String {
        format!(
            "CONTEXT:\n{}\n\nUSER'S QUESTION:\n{}\n\nFRIENDLY ANSWER:",
            context, question
        )
    }

    /// System instruction, then history, then the context-bearing question.
    pub fn build_messages(question: &str, context: &str, history: &[ChatMessage]) -> Vec<LLMMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(LLMMessage::system(SYSTEM_PROMPT));
        messages.extend(Self::history_turns(history));
        messages.push(LLMMessage::user(Self::create_question_prompt(question, context)));
        messages
    }

    /// Run retrieval and open the completion, stopping at the first fragment.
    ///
    /// Any `Err` from here happened before a byte was produced and can still
    /// be reported to the caller as a normal error response.
    pub async fn start(
        state: &AppState,
        question: &str,
        history: &[ChatMessage],
    ) -> AppResult<ReplyStream> {
        info!(
            question_len = question.len(),
            history = history.len(),
            "Generating reply"
        );

        let context = VectorSearch::retrieve_context(
            state.embedder.as_ref(),
            state.store.as_ref(),
            question,
            state.config.retrieval.top_k,
        )
        .await?;
        debug!(context_len = context.len(), "Context assembled");

        let messages = Self::build_messages(question, &context, history);
        let mut stream = state.completer.stream_chat(&messages).await?;

        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            if !fragment.is_empty() {
                return Ok(ReplyStream::Streaming {
                    first: fragment,
                    rest: stream,
                });
            }
        }
        Ok(ReplyStream::Finished)
    }
}
