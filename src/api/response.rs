use crate::api::models::{FinishReason, Generation, ToolCallRequest};
use crate::error::ApiError;
use serde_json::Value;

fn first_choice(response_json: &Value) -> Result<&Value, ApiError> {
    let choices = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| ApiError::InvalidResponse("No choices in response".to_string()))?;

    choices
        .first()
        .ok_or_else(|| ApiError::InvalidResponse("Empty choices array".to_string()))
}

fn first_message(response_json: &Value) -> Result<&Value, ApiError> {
    first_choice(response_json)?
        .get("message")
        .ok_or_else(|| ApiError::InvalidResponse("No message in response".to_string()))
}

/// Parse a non-streaming API response and extract tool calls if present
pub fn parse_tool_calls(response_json: &Value) -> Result<Option<Vec<ToolCallRequest>>, ApiError> {
    let message = first_message(response_json)?;

    let Some(tool_calls) = message.get("tool_calls").and_then(|tc| tc.as_array()) else {
        return Ok(None);
    };

    let calls: Vec<ToolCallRequest> = tool_calls
        .iter()
        .filter_map(|call| {
            let function = call.get("function")?;
            Some(ToolCallRequest {
                id: call.get("id").and_then(|i| i.as_str()).map(str::to_string),
                name: function.get("name")?.as_str()?.to_string(),
                arguments: function
                    .get("arguments")
                    .and_then(|a| a.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect();

    if calls.is_empty() {
        Ok(None)
    } else {
        Ok(Some(calls))
    }
}

/// Extract content from a non-streaming response
pub fn extract_content(response_json: &Value) -> Result<Option<String>, ApiError> {
    Ok(first_message(response_json)?
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string()))
}

pub fn extract_finish_reason(response_json: &Value) -> Result<FinishReason, ApiError> {
    Ok(FinishReason::parse(
        first_choice(response_json)?
            .get("finish_reason")
            .and_then(|r| r.as_str()),
    ))
}

pub fn parse_completion(response_json: &Value) -> Result<Generation, ApiError> {
    Ok(Generation {
        content: extract_content(response_json)?.unwrap_or_default(),
        tool_calls: parse_tool_calls(response_json)?.unwrap_or_default(),
        finish_reason: extract_finish_reason(response_json)?,
    })
}
