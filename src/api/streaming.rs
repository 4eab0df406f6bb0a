use crate::api::models::{FinishReason, Generation, StreamResponse, ToolCallRequest};
use crate::error::ApiError;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::time::{timeout, Duration};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Splits a server-sent-events byte stream into `data:` payloads.
///
/// Chunks may end anywhere, including inside a multi-byte character, so
/// bytes are held until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &Bytes) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = Self::parse_line(line.trim_end_matches(['\r', '\n'])) {
                events.push(event);
            }
        }
        events
    }

    /// Drains whatever is left once the connection closes.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&rest);
        Self::parse_line(line.trim_end_matches(['\r', '\n']))
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        if line.is_empty() || line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(colon) => (line[..colon].trim(), line[colon + 1..].trim_start()),
            None => (line.trim(), ""),
        };

        match field {
            "data" if value == "[DONE]" => Some(SseEvent::Done),
            "data" => Some(SseEvent::Data(value.to_string())),
            "event" | "id" | "retry" => {
                trace!(field, value, "SSE field");
                None
            }
            _ => {
                trace!(field, "unknown SSE field");
                None
            }
        }
    }
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Folds streamed chat-completion chunks into a [`Generation`].
///
/// Tool calls arrive as fragments keyed by index: the name and argument text
/// are concatenated per index until the stream ends.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    content: String,
    tool_calls: BTreeMap<usize, PartialToolCall>,
    finish_reason: Option<String>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one chunk and returns the text delta it carried, if any.
    pub fn apply(&mut self, chunk: StreamResponse) -> Option<String> {
        let mut text = String::new();

        for choice in chunk.choices.unwrap_or_default() {
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }

            let Some(delta) = choice.delta else {
                continue;
            };

            if let Some(content) = delta.content {
                self.content.push_str(&content);
                text.push_str(&content);
            }

            for fragment in delta.tool_calls.unwrap_or_default() {
                let call = self.tool_calls.entry(fragment.index).or_default();
                if let Some(id) = fragment.id {
                    call.id = Some(id);
                }
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name {
                        call.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        call.arguments.push_str(&arguments);
                    }
                }
            }
        }

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Parses one `data:` payload and applies it. A payload that does not
    /// decode, or that carries an `error` object, fails the stream.
    pub fn apply_data(&mut self, data: &str) -> Result<Option<String>, ApiError> {
        let mut chunk: StreamResponse = serde_json::from_str(data).map_err(|e| {
            ApiError::InvalidResponse(format!("undecodable stream chunk: {}", e))
        })?;
        if let Some(error) = chunk.error.take() {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ApiError::InvalidResponse(format!(
                "stream aborted by provider: {}",
                message
            )));
        }
        Ok(self.apply(chunk))
    }

    pub fn finish(self) -> Generation {
        let tool_calls: Vec<ToolCallRequest> = self
            .tool_calls
            .into_values()
            .filter(|call| !call.name.is_empty() || !call.arguments.is_empty())
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.name,
                arguments: call.arguments,
            })
            .collect();

        let finish_reason = match self.finish_reason.as_deref() {
            Some(reason) => FinishReason::parse(Some(reason)),
            None if !tool_calls.is_empty() => FinishReason::ToolCalls,
            None => FinishReason::Unknown,
        };

        Generation {
            content: self.content,
            tool_calls,
            finish_reason,
        }
    }
}

/// Reads a streaming chat-completion response to the end, handing each text
/// delta to `on_token` as soon as it arrives.
pub async fn process_streaming_response(
    response: reqwest::Response,
    chunk_timeout_secs: u64,
    on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
) -> Result<Generation, ApiError> {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut accumulator = StreamAccumulator::new();
    let chunk_timeout = Duration::from_secs(chunk_timeout_secs);

    'read: loop {
        let chunk = match timeout(chunk_timeout, stream.next()).await {
            Ok(Some(chunk)) => chunk?,
            Ok(None) => break,
            Err(_) => {
                return Err(ApiError::Timeout {
                    secs: chunk_timeout_secs,
                })
            }
        };

        for event in decoder.push(&chunk) {
            match event {
                SseEvent::Done => break 'read,
                SseEvent::Data(data) => apply_event(&mut accumulator, &data, on_token)?,
            }
        }
    }

    if let Some(SseEvent::Data(data)) = decoder.finish() {
        apply_event(&mut accumulator, &data, on_token)?;
    }

    let generation = accumulator.finish();
    debug!(
        content_len = generation.content.len(),
        tool_calls = generation.tool_calls.len(),
        finish_reason = ?generation.finish_reason,
        "stream finished"
    );
    Ok(generation)
}

fn apply_event(
    accumulator: &mut StreamAccumulator,
    data: &str,
    on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
) -> Result<(), ApiError> {
    match accumulator.apply_data(data) {
        Ok(Some(text)) => on_token(&text),
        Ok(None) => {}
        Err(e) => {
            debug!(error = %e, data, "stream chunk rejected");
            return Err(e);
        }
    }
    Ok(())
}
