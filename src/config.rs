use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Root of the order backend API, e.g. `http://localhost:8000/api`.
    pub backend_api_url: String,
    pub ledger_capacity: usize,
    pub new_order_debounce: Duration,
    pub update_debounce: Duration,
    pub counterparty_top_n: usize,
    pub history_on_startup: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let backend_api_url = env_map
            .get("BACKEND_API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("BACKEND_API_URL".to_string()))?;

        let ledger_capacity = parse_or(
            &env_map,
            "LEDGER_CAPACITY",
            crate::ledger::DEFAULT_CAPACITY,
            "must be a positive integer",
        )?;
        if ledger_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "LEDGER_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let new_order_debounce_ms =
            parse_or(&env_map, "NEW_ORDER_DEBOUNCE_MS", 100u64, "must be a valid u64")?;
        let update_debounce_ms =
            parse_or(&env_map, "UPDATE_DEBOUNCE_MS", 300u64, "must be a valid u64")?;

        let counterparty_top_n = parse_or(
            &env_map,
            "COUNTERPARTY_TOP_N",
            crate::engine::counterparty::DEFAULT_TOP_N,
            "must be a valid usize",
        )?;

        let history_on_startup = match env_map
            .get("HISTORY_ON_STARTUP")
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
            .unwrap_or("true")
        {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "HISTORY_ON_STARTUP".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            backend_api_url,
            ledger_capacity,
            new_order_debounce: Duration::from_millis(new_order_debounce_ms),
            update_debounce: Duration::from_millis(update_debounce_ms),
            counterparty_top_n,
            history_on_startup,
        })
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expected: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expected.to_string())),
    }
}
