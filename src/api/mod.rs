pub mod client;
pub mod models;
pub mod response;
pub mod streaming;

pub use client::{ModelClient, OpenAiClient};
pub use models::{
    FinishReason, Generation, GenerationParams, GenerationRequest, RequestBody, ToolCallRequest,
};
pub use streaming::{process_streaming_response, SseDecoder, SseEvent, StreamAccumulator};
