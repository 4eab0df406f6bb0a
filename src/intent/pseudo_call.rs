use super::{Encoding, FunctionCall, IntentExtractor};
use crate::api::Generation;
use crate::error::ExtractionError;
use crate::functions::KnownFunction;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Reads calls written inline as Python-style pseudo code, e.g.
/// `get_showtimes("Dune", "Seattle")`.
///
/// Arguments are positional and split on commas, so an argument containing
/// a comma outside double quotes is split in two.
#[derive(Debug, Clone, Copy, Default)]
pub struct PseudoCallExtractor;

/// Where a call sits inside the text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CallSpan {
    name: String,
    start: usize,
    open: usize,
}

fn bare_call_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)^\s*([a-z][a-z0-9]*(?:_[a-z0-9]+)+)\s*\(").ok())
        .as_ref()
}

impl PseudoCallExtractor {
    pub fn parse(text: &str) -> Result<Option<FunctionCall>, ExtractionError> {
        let Some(span) = Self::locate(text) else {
            return Ok(None);
        };

        let close = matching_paren(text, span.open).ok_or_else(|| {
            ExtractionError::UnbalancedParentheses {
                function: span.name.clone(),
            }
        })?;
        let values = split_arguments(&text[span.open + 1..close]);

        let arguments: BTreeMap<String, String> = match KnownFunction::from_name(&span.name) {
            Some(function) => {
                let params = function.parameters();
                values
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let key = params
                            .get(i)
                            .map(|p| (*p).to_string())
                            .unwrap_or_else(|| format!("arg{}", i + 1));
                        (key, value)
                    })
                    .collect()
            }
            None => values
                .into_iter()
                .enumerate()
                .map(|(i, value)| (format!("arg{}", i + 1), value))
                .collect(),
        };

        Ok(Some(FunctionCall {
            name: span.name,
            rationale: None,
            arguments,
        }))
    }

    /// Finds the earliest known call in the text. When none is present, a
    /// reply that consists of nothing but a single snake_case call is taken
    /// as a request for an unknown function.
    fn locate(text: &str) -> Option<CallSpan> {
        let known = KnownFunction::ALL
            .iter()
            .filter_map(|f| {
                let pattern = format!("{}(", f.name());
                text.find(&pattern).map(|start| CallSpan {
                    name: f.name().to_string(),
                    start,
                    open: start + pattern.len() - 1,
                })
            })
            .min_by_key(|span| span.start);
        if known.is_some() {
            return known;
        }

        let trimmed = text.trim_end();
        if !trimmed.ends_with(')') {
            return None;
        }
        let captures = bare_call_pattern()?.captures(text)?;
        let name = captures.get(1)?;
        let whole = captures.get(0)?;
        Some(CallSpan {
            name: name.as_str().to_string(),
            start: name.start(),
            open: whole.end() - 1,
        })
    }
}

impl IntentExtractor for PseudoCallExtractor {
    fn encoding(&self) -> Encoding {
        Encoding::Pseudo
    }

    fn extract(&self, generation: &Generation) -> Result<Vec<FunctionCall>, ExtractionError> {
        Ok(Self::parse(&generation.content)?.into_iter().collect())
    }

    fn visible_prefix_len(&self, partial: &str) -> usize {
        let mut visible = partial.len();

        for function in KnownFunction::ALL {
            let pattern = format!("{}(", function.name());
            if let Some(start) = partial.find(&pattern) {
                visible = visible.min(start);
            }
            // A suffix that could still grow into the call.
            for (i, _) in partial.char_indices().rev().take(pattern.len()) {
                if pattern.starts_with(&partial[i..]) {
                    visible = visible.min(i);
                }
            }
        }

        // A reply that opens with a bare identifier may turn out to be a call.
        let rest = partial.trim_start();
        let leading = partial.len() - rest.len();
        let ident_len = rest
            .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'))
            .unwrap_or(rest.len());
        let opens_call = rest[ident_len..].trim_start().starts_with('(') && rest[..ident_len].contains('_');
        if ident_len == rest.len() || opens_call {
            visible = visible.min(leading);
        }

        visible
    }

    fn call_preamble<'a>(&self, content: &'a str) -> &'a str {
        match Self::locate(content) {
            Some(span) => content[..span.start].trim_end(),
            None => content,
        }
    }
}

/// Index of the `)` closing the `(` at `open`, skipping double-quoted text.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;

    for (i, c) in text[open..].char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_arguments(interior: &str) -> Vec<String> {
    if interior.trim().is_empty() {
        return Vec::new();
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in interior.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => values.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    values.push(current);

    values.iter().map(|v| clean_argument(v)).collect()
}

fn clean_argument(raw: &str) -> String {
    let value = raw.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
