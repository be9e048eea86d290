use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::fs;
use std::path::Path;
use url::Url;

const APP_JSON: &str = "app.json";

pub const DEFAULT_CHAT_ENDPOINT: &str = "http://127.0.0.1:5000/chat";
pub const DEFAULT_QUOTE_ENDPOINT: &str = "https://zenquotes.io/api/random";
pub const DEFAULT_TIMEZONE: &str = "UTC";

const CHAT_ENDPOINT_ENV: &str = "STUDY_PLANNER_CHAT_ENDPOINT";
const QUOTE_ENDPOINT_ENV: &str = "STUDY_PLANNER_QUOTE_ENDPOINT";
const TIMEZONE_ENV: &str = "STUDY_PLANNER_TIMEZONE";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub chat_endpoint: Url,
    pub quote_endpoint: Url,
    pub timezone: Tz,
}

fn default_app_file() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "Study Planner",
        "chatEndpoint": DEFAULT_CHAT_ENDPOINT,
        "quoteEndpoint": DEFAULT_QUOTE_ENDPOINT,
        "timezone": DEFAULT_TIMEZONE
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_file())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    load_app_config_with_lookup(config_dir, |key| std::env::var(key).ok())
}

/// Environment values win over `app.json`; blank values are ignored.
pub fn load_app_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let app = read_config(&config_dir.join(APP_JSON))?;
    let resolve = |env_key: &str, field: &str, fallback: &str| -> String {
        lookup(env_key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| {
                app.get(field)
                    .and_then(serde_json::Value::as_str)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(ToOwned::to_owned)
            })
            .unwrap_or_else(|| fallback.to_string())
    };

    Ok(AppConfig {
        chat_endpoint: parse_endpoint(
            &resolve(CHAT_ENDPOINT_ENV, "chatEndpoint", DEFAULT_CHAT_ENDPOINT),
            "chatEndpoint",
        )?,
        quote_endpoint: parse_endpoint(
            &resolve(QUOTE_ENDPOINT_ENV, "quoteEndpoint", DEFAULT_QUOTE_ENDPOINT),
            "quoteEndpoint",
        )?,
        timezone: parse_timezone(&resolve(TIMEZONE_ENV, "timezone", DEFAULT_TIMEZONE))?,
    })
}

fn parse_endpoint(value: &str, field_name: &str) -> Result<Url, InfraError> {
    let url = Url::parse(value)
        .map_err(|error| InfraError::InvalidConfig(format!("{field_name} is not a valid URL: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InfraError::InvalidConfig(format!(
            "{field_name} must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

fn parse_timezone(value: &str) -> Result<Tz, InfraError> {
    value
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("unknown timezone '{value}': {error}")))
}
