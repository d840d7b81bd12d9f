use std::env;
use std::process;

const DEFAULT_AI_API_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_AI_MODEL: &str = "meta-llama/llama-4-maverick-17b-128e-instruct";

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
}

/// Reports an unusable setting on stderr and exits. Logging is not up yet
/// when configuration is read.
fn exit_with_config_error(message: String) -> ! {
    eprintln!("configuration error: {}", message);
    process::exit(1);
}

/// Reads a variable that must be present and non-blank.
pub fn get_required_env(key: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => exit_with_config_error(format!(
            "{} is required (set it in the environment or .env)",
            key
        )),
    }
}

/// Reads a variable, treating a blank value like an unset one.
pub fn get_optional_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn port_from(value: &str) -> Result<u16, String> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(format!("'{}' is not a TCP port (1-65535)", value)),
    }
}

fn seconds_from(value: &str) -> Result<u64, String> {
    match value.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(seconds),
        _ => Err(format!("'{}' is not a positive number of seconds", value)),
    }
}

/// Accepts absolute http(s) URLs and strips trailing slashes so paths can be
/// appended with `format!("{}/...")`.
fn base_url_from(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| format!("'{}' is not a valid URL: {}", value, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.trim_end_matches('/').to_string()),
        scheme => Err(format!("'{}' uses {}://, expected http:// or https://", value, scheme)),
    }
}

pub fn parse_port(value: &str, var_name: &str) -> u16 {
    port_from(value).unwrap_or_else(|e| exit_with_config_error(format!("{}: {}", var_name, e)))
}

pub fn parse_seconds(value: &str, var_name: &str) -> u64 {
    seconds_from(value).unwrap_or_else(|e| exit_with_config_error(format!("{}: {}", var_name, e)))
}

pub fn validate_url(url: &str, var_name: &str) -> String {
    base_url_from(url).unwrap_or_else(|e| exit_with_config_error(format!("{}: {}", var_name, e)))
}

impl AiConfig {
    pub fn from_env() -> Self {
        let api_base_url = get_optional_env("AI_API_BASE_URL", DEFAULT_AI_API_BASE_URL);
        let api_base_url = validate_url(&api_base_url, "AI_API_BASE_URL");

        let api_key = get_required_env("AI_API_KEY");
        let model = get_optional_env("AI_MODEL", DEFAULT_AI_MODEL);

        let timeout_str = get_optional_env("AI_TIMEOUT_SECONDS", "120");
        let timeout_seconds = parse_seconds(&timeout_str, "AI_TIMEOUT_SECONDS");

        Self {
            api_base_url,
            api_key,
            model,
            timeout_seconds,
        }
    }
}
