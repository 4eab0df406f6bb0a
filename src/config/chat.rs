use super::defaults::{
    default_call_timeout, default_max_generations, default_max_tokens, default_model,
    default_temperature,
};
use crate::intent::Encoding;
use crate::review::ReviewStrategy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub default_model: Option<String>,
    /// Model used for the review decision; falls back to `default_model`.
    #[serde(default)]
    pub review_model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    pub fn model(&self) -> String {
        self.default_model.clone().unwrap_or_else(default_model)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or_else(default_temperature)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or_else(default_max_tokens)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub encoding: Option<Encoding>,
    #[serde(default)]
    pub max_generations: Option<usize>,
    #[serde(default)]
    pub surface_call_content: Option<bool>,
}

impl ChatConfig {
    pub fn max_generations(&self) -> usize {
        self.max_generations.unwrap_or_else(default_max_generations)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub strategy: ReviewStrategy,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// YAML or JSON catalog file. The bundled catalog is used when unset.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub call_timeout: Option<u64>,
}

impl CatalogConfig {
    pub fn call_timeout(&self) -> u64 {
        self.call_timeout.unwrap_or_else(default_call_timeout)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
}
