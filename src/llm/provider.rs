use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::types::{AppResult, LLMMessage};

/// Lazy, finite, non-restartable sequence of answer fragments.
///
/// An `Err` item ends the stream; nothing follows it.
pub type TokenStream = BoxStream<'static, AppResult<String>>;

#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Start a streamed completion.
    ///
    /// An `Err` here means the request never produced output (bad status,
    /// connection failure). Failures after that arrive inside the stream.
    async fn stream_chat(&self, messages: &[LLMMessage]) -> AppResult<TokenStream>;
}
