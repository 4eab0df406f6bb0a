use super::Config;
use regex::Regex;
use std::env;
use std::sync::OnceLock;

fn env_var_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").ok())
        .as_ref()
}

/// Expand environment variables in a string using ${VAR_NAME} syntax
pub fn expand_env_var_in_string(value: &str) -> String {
    let Some(re) = env_var_pattern() else {
        return value.to_string();
    };

    let mut result = value.to_string();
    for cap in re.captures_iter(value) {
        let var_name = &cap[1];
        let replacement = env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name));
        result = result.replace(&cap[0], &replacement);
    }

    result
}

/// Rejects settings the reply loop cannot run with.
pub fn validate(config: &Config) -> Result<(), String> {
    if config.max_generations == 0 {
        return Err("max_generations must be at least 1".to_string());
    }
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(format!(
            "temperature must be between 0 and 2, got {}",
            config.temperature
        ));
    }
    if config.max_tokens == 0 {
        return Err("max_tokens must be at least 1".to_string());
    }
    if config.request_timeout == 0 || config.stream_timeout == 0 || config.call_timeout == 0 {
        return Err("timeouts must be at least one second".to_string());
    }
    Ok(())
}
