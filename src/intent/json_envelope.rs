use super::{arguments_from_object, Encoding, FunctionCall, IntentExtractor};
use crate::api::Generation;
use crate::error::ExtractionError;
use serde_json::Value;

/// Reads calls written as a top-level JSON object:
///
/// ```text
/// {"function_name": "get_showtimes", "rationale": "...", "title": "Dune", "location": "Seattle"}
/// ```
///
/// Output that does not start with `{` is a plain reply. Output that does,
/// but is not a well-formed envelope, is an error rather than a reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEnvelopeExtractor;

impl JsonEnvelopeExtractor {
    pub fn parse(text: &str) -> Result<Option<FunctionCall>, ExtractionError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(ExtractionError::InvalidEnvelope(
                "expected a JSON object".to_string(),
            ));
        };

        let name = match object.remove("function_name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => {
                return Err(ExtractionError::InvalidEnvelope(
                    "\"function_name\" must be a non-empty string".to_string(),
                ))
            }
            None => {
                return Err(ExtractionError::InvalidEnvelope(
                    "missing required field \"function_name\"".to_string(),
                ))
            }
        };

        let rationale = match object.remove("rationale") {
            Some(Value::String(r)) => r,
            Some(Value::Null) | None => {
                return Err(ExtractionError::InvalidEnvelope(
                    "missing required field \"rationale\"".to_string(),
                ))
            }
            Some(other) => other.to_string(),
        };

        // Some models nest the parameters instead of inlining them.
        if let Some(Value::Object(nested)) = object.remove("arguments") {
            for (key, value) in nested {
                object.entry(key).or_insert(value);
            }
        }

        Ok(Some(FunctionCall {
            name,
            rationale: Some(rationale),
            arguments: arguments_from_object(object)?,
        }))
    }
}

impl IntentExtractor for JsonEnvelopeExtractor {
    fn encoding(&self) -> Encoding {
        Encoding::Json
    }

    fn extract(&self, generation: &Generation) -> Result<Vec<FunctionCall>, ExtractionError> {
        Ok(Self::parse(&generation.content)?.into_iter().collect())
    }

    fn visible_prefix_len(&self, partial: &str) -> usize {
        let rest = partial.trim_start();
        if rest.is_empty() || rest.starts_with('{') {
            0
        } else {
            partial.len()
        }
    }

    fn call_preamble<'a>(&self, content: &'a str) -> &'a str {
        &content[..0]
    }
}
