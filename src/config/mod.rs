mod api;
mod chat;
mod defaults;
mod validation;

use crate::cli::Args;
use crate::intent::Encoding;
use crate::review::ReviewStrategy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use api::{normalize_endpoint, ApiConfig};
pub use chat::{CatalogConfig, ChatConfig, ModelConfig, ReviewConfig, SessionConfig};
pub use defaults::DEFAULT_API_ENDPOINT;
pub use validation::{expand_env_var_in_string, validate};

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    pub review_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream_timeout: u64,
    pub request_timeout: u64,
    pub encoding: Encoding,
    pub max_generations: usize,
    pub surface_call_content: Option<bool>,
    pub review_strategy: ReviewStrategy,
    pub catalog_path: Option<PathBuf>,
    pub call_timeout: u64,
    pub verbose: bool,
}

/// The on-disk configuration file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> Result<Self, String> {
        let file_config = FileConfig::load().map_err(|e| format!("{:#}", e))?;
        let config = Self::resolve(args, file_config, |key| env::var(key).ok())?;
        validate(&config)?;
        Ok(config)
    }

    /// Precedence for every setting: CLI args > env var > config file > default.
    pub fn resolve(
        args: &Args,
        file_config: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        // API key is only ever read from the environment
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or("OPENAI_API_KEY environment variable not set")?;

        let api_endpoint = args
            .api_endpoint
            .clone()
            .or_else(|| lookup("MOVIEBOT_API_ENDPOINT"))
            .or(file_config.api.endpoint.clone())
            .map(|endpoint| normalize_endpoint(&endpoint))
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let model = args
            .model
            .clone()
            .or_else(|| lookup("MOVIEBOT_MODEL"))
            .unwrap_or_else(|| file_config.model.model());
        let review_model = file_config
            .model
            .review_model
            .clone()
            .unwrap_or_else(|| model.clone());

        let encoding = match args.encoding {
            Some(encoding) => encoding,
            None => match lookup("MOVIEBOT_ENCODING") {
                Some(value) => value.parse()?,
                None => file_config.chat.encoding.unwrap_or_default(),
            },
        };

        let stream_timeout = lookup("MOVIEBOT_STREAM_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or_else(|| file_config.api.stream_timeout());

        let verbose = args.verbose
            || lookup("MOVIEBOT_VERBOSE")
                .map(|v| parse_flag(&v))
                .or(file_config.session.verbose)
                .unwrap_or(false);

        let surface_call_content = if args.show_call_content {
            Some(true)
        } else if args.hide_call_content {
            Some(false)
        } else {
            file_config.chat.surface_call_content
        };

        let review_strategy = if args.no_reviews {
            ReviewStrategy::Off
        } else {
            args.review_strategy.unwrap_or(file_config.review.strategy)
        };

        let catalog_path = args.catalog.clone().or_else(|| {
            file_config
                .catalog
                .path
                .as_deref()
                .map(|p| PathBuf::from(expand_env_var_in_string(p)))
        });

        Ok(Config {
            api_key,
            api_endpoint,
            model,
            review_model,
            temperature: file_config.model.temperature(),
            max_tokens: file_config.model.max_tokens(),
            stream_timeout,
            request_timeout: file_config.api.request_timeout(),
            encoding,
            max_generations: args
                .max_generations
                .unwrap_or_else(|| file_config.chat.max_generations()),
            surface_call_content,
            review_strategy,
            catalog_path,
            call_timeout: file_config.catalog.call_timeout(),
            verbose,
        })
    }

    pub fn get_current_date() -> String {
        chrono::Local::now().format("%A, %B %d, %Y").to_string()
    }
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        // No config file found, return default
        Ok(FileConfig::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config file: {}", path.display()))
        }
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Current directory (highest priority - local override)
        paths.push(PathBuf::from(".moviebot.yaml"));
        paths.push(PathBuf::from(".moviebot.yml"));
        paths.push(PathBuf::from(".moviebot.json"));

        // 2. User's config directory (global config)
        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("moviebot");
            paths.push(config_dir.join("moviebot.yaml"));
            paths.push(config_dir.join("moviebot.yml"));
            paths.push(config_dir.join("moviebot.json"));
        }

        paths
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("moviebot").join("moviebot.yaml"))
    }

    /// Writes the example configuration to `path`, refusing to overwrite.
    pub fn write_example(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}

pub const EXAMPLE_CONFIG: &str = r#"# moviebot configuration
# OPENAI_API_KEY must be set in the environment.

api:
  endpoint: https://api.openai.com/v1
  stream_timeout: 30
  request_timeout: 60

model:
  default_model: gpt-4o-mini
  # review_model: gpt-4o-mini
  temperature: 0.2
  max_tokens: 500

chat:
  # structured, json or pseudo
  encoding: structured
  max_generations: 6
  # surface_call_content: true

review:
  # auto, json, tool or off
  strategy: auto

catalog:
  # path: ${HOME}/.config/moviebot/catalog.yaml
  call_timeout: 10

session:
  verbose: false
"#;
