//! Detection of function-call requests in model output.
//!
//! Three encodings are supported behind [`IntentExtractor`]: structured tool
//! calls (the default), a JSON envelope, and inline pseudo-code calls.

mod json_envelope;
mod pseudo_call;
mod structured;

pub use json_envelope::JsonEnvelopeExtractor;
pub use pseudo_call::PseudoCallExtractor;
pub use structured::StructuredExtractor;

use crate::api::Generation;
use crate::error::ExtractionError;
use crate::functions::KnownFunction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Structured,
    #[serde(alias = "json_envelope")]
    Json,
    #[serde(alias = "pseudo_call")]
    Pseudo,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Structured => "structured",
            Encoding::Json => "json",
            Encoding::Pseudo => "pseudo",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" | "tools" => Ok(Encoding::Structured),
            "json" | "json_envelope" => Ok(Encoding::Json),
            "pseudo" | "pseudo_call" => Ok(Encoding::Pseudo),
            other => Err(format!(
                "unknown encoding '{}' (expected structured, json or pseudo)",
                other
            )),
        }
    }
}

/// A request from the model to run one function. Lives for a single
/// extract/dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionCall {
    pub name: String,
    pub rationale: Option<String>,
    pub arguments: BTreeMap<String, String>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn known(&self) -> Option<KnownFunction> {
        KnownFunction::from_name(&self.name)
    }

    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

/// A pluggable strategy for reading function requests out of model output.
pub trait IntentExtractor: Send + Sync {
    fn encoding(&self) -> Encoding;

    /// Tool definitions to send with each generation, if the encoding uses them.
    fn tools(&self) -> Option<Vec<Value>> {
        None
    }

    /// Returns the requested calls in order; an empty vector means the output
    /// is a plain reply.
    fn extract(&self, generation: &Generation) -> Result<Vec<FunctionCall>, ExtractionError>;

    /// How many leading bytes of partially streamed text can be shown to the
    /// user without risking showing the start of a function request.
    fn visible_prefix_len(&self, partial: &str) -> usize;

    /// The natural-language text that accompanies a call in `content`.
    fn call_preamble<'a>(&self, content: &'a str) -> &'a str;
}

pub fn extractor_for(encoding: Encoding) -> Box<dyn IntentExtractor> {
    match encoding {
        Encoding::Structured => Box::new(StructuredExtractor),
        Encoding::Json => Box::new(JsonEnvelopeExtractor),
        Encoding::Pseudo => Box::new(PseudoCallExtractor),
    }
}

/// Converts a JSON object of named arguments into string arguments.
pub(crate) fn arguments_from_object(
    object: Map<String, Value>,
) -> Result<BTreeMap<String, String>, ExtractionError> {
    let mut arguments = BTreeMap::new();
    for (key, value) in object {
        match value {
            Value::Null => {}
            Value::String(s) => {
                arguments.insert(key, s);
            }
            Value::Bool(_) | Value::Number(_) => {
                arguments.insert(key, value.to_string());
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(ExtractionError::InvalidEnvelope(format!(
                    "argument \"{}\" must be a string",
                    key
                )));
            }
        }
    }
    Ok(arguments)
}
