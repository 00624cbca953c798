// Server-sent event decoding for streamed chat completions
//
// OpenAI-compatible providers send one `data: {json}` line per chunk and
// finish with `data: [DONE]`.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::{stream::BoxStream, Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use super::TokenStream;
use crate::types::{AppError, AppResult};

/// Splits a byte stream into `data:` payloads. Bytes may arrive split
/// anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed bytes; returns the payloads of every line completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a final line that had no trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest).to_string())
}

#[derive(Debug, PartialEq)]
pub enum StreamEvent {
    Delta(String),
    Done,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkError {
    message: String,
}

/// Interpret one `data:` payload.
pub fn parse_event(payload: &str) -> AppResult<StreamEvent> {
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(StreamEvent::Done);
    }

    let chunk: ChatChunk = serde_json::from_str(payload)
        .map_err(|e| AppError::LLMApi(format!("Malformed stream chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(AppError::LLMApi(format!("Stream error: {}", error.message)));
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .unwrap_or_default();
    Ok(StreamEvent::Delta(content))
}

struct DecodeState {
    body: BoxStream<'static, Result<Bytes, String>>,
    decoder: SseDecoder,
    pending: VecDeque<AppResult<String>>,
    finished: bool,
}

impl DecodeState {
    /// Queue the outcome of one payload. Returns false once the stream is over.
    fn accept(&mut self, payload: &str) -> bool {
        match parse_event(payload) {
            Ok(StreamEvent::Delta(text)) => {
                if !text.is_empty() {
                    self.pending.push_back(Ok(text));
                }
                true
            }
            Ok(StreamEvent::Done) => {
                self.finished = true;
                false
            }
            Err(e) => {
                self.pending.push_back(Err(e));
                self.finished = true;
                false
            }
        }
    }
}

/// Turn a raw event-stream body into answer fragments.
pub fn decode_stream<S, E>(body: S) -> TokenStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + 'static,
{
    let state = DecodeState {
        body: body.map(|r| r.map_err(|e| e.to_string())).boxed(),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for payload in state.decoder.push(&chunk) {
                        if !state.accept(&payload) {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(AppError::LLMApi(format!(
                        "Completion stream interrupted: {}",
                        e
                    ))));
                    state.finished = true;
                }
                None => {
                    debug!("Completion body ended");
                    if let Some(payload) = state.decoder.finish() {
                        state.accept(&payload);
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
