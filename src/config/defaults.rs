pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

pub fn default_temperature() -> f32 {
    0.2
}

pub fn default_max_tokens() -> u32 {
    500
}

pub fn default_stream_timeout() -> u64 {
    30
}

pub fn default_request_timeout() -> u64 {
    60
}

pub fn default_max_generations() -> usize {
    crate::orchestrator::DEFAULT_MAX_GENERATIONS
}

pub fn default_call_timeout() -> u64 {
    10
}
