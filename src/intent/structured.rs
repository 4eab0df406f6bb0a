use super::{arguments_from_object, Encoding, FunctionCall, IntentExtractor};
use crate::api::{Generation, ToolCallRequest};
use crate::error::ExtractionError;
use crate::functions::format_tools_for_llm;
use serde_json::Value;
use std::collections::BTreeMap;

/// Reads calls from the model's native tool-calling channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredExtractor;

impl StructuredExtractor {
    pub fn parse_tool_call(call: &ToolCallRequest) -> Result<FunctionCall, ExtractionError> {
        let name = call.name.trim();
        if name.is_empty() {
            return Err(ExtractionError::InvalidEnvelope(
                "tool call without a function name".to_string(),
            ));
        }

        let arguments = if call.arguments.trim().is_empty() {
            BTreeMap::new()
        } else {
            match serde_json::from_str::<Value>(&call.arguments)
                .map_err(|e| ExtractionError::InvalidJson(e.to_string()))?
            {
                Value::Object(object) => arguments_from_object(object)?,
                other => {
                    return Err(ExtractionError::InvalidEnvelope(format!(
                        "arguments for {} must be a JSON object, got {}",
                        name, other
                    )))
                }
            }
        };

        Ok(FunctionCall {
            name: name.to_string(),
            rationale: None,
            arguments,
        })
    }
}

impl IntentExtractor for StructuredExtractor {
    fn encoding(&self) -> Encoding {
        Encoding::Structured
    }

    fn tools(&self) -> Option<Vec<Value>> {
        Some(format_tools_for_llm())
    }

    fn extract(&self, generation: &Generation) -> Result<Vec<FunctionCall>, ExtractionError> {
        generation
            .tool_calls
            .iter()
            .map(Self::parse_tool_call)
            .collect()
    }

    fn visible_prefix_len(&self, partial: &str) -> usize {
        partial.len()
    }

    fn call_preamble<'a>(&self, content: &'a str) -> &'a str {
        content
    }
}
