use thiserror::Error;

/// Failures at the language model boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Model request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid authorization header: {0}")]
    InvalidHeader(String),
}

/// Model output that looked like a function request but could not be read as one.
///
/// The display text is what gets appended to history and shown to the user,
/// so the model can correct itself on the next generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Invalid function call: {0}")]
    InvalidEnvelope(String),
    #[error("Invalid function call syntax: unbalanced parentheses in call to {function}")]
    UnbalancedParentheses { function: String },
}

/// Errors raised by the external movie collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("no movie matching '{0}'")]
    UnknownMovie(String),
    #[error("no theaters found near '{0}'")]
    UnknownLocation(String),
    #[error("{movie} is not showing at {theater} at {showtime}")]
    ShowtimeUnavailable {
        theater: String,
        movie: String,
        showtime: String,
    },
    #[error("{0}")]
    Catalog(String),
}

/// Outcome of a failed dispatch. Every variant renders to the text that is
/// injected into the conversation in place of a function result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Error processing {function}: {detail}")]
    InvalidArguments { function: String, detail: String },
    #[error("Error processing {function}: {source}")]
    Service {
        function: String,
        #[source]
        source: ServiceError,
    },
    #[error("Error processing {function}: timed out after {secs}s")]
    Timeout { function: String, secs: u64 },
}

impl DispatchError {
    pub fn is_unknown_function(&self) -> bool {
        matches!(self, DispatchError::UnknownFunction(_))
    }
}

/// Reasons a turn ends without a plain assistant reply.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("{0}")]
    Model(#[from] ApiError),
    #[error("Loop limit exceeded: no final reply after {limit} generations")]
    LoopLimitExceeded { limit: usize },
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

impl TurnError {
    /// Whether the reply loop already showed this error to the user as a notice.
    pub fn shown_as_notice(&self) -> bool {
        !matches!(self, TurnError::SessionNotFound(_))
    }
}

#[derive(Debug, Error)]
pub enum MovieBotError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Turn(#[from] TurnError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MovieBotError>;
