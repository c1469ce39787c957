use std::num::ParseIntError;

use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://blog_comments.db";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_USER_NAME: &str = "Kyle";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT value {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid {name} value {value:?}, expected true or false")]
    InvalidFlag { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub client_url: Option<String>,
    pub current_user_name: String,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => DEFAULT_PORT,
        };

        let seed_demo_data = match lookup("SEED_DEMO_DATA") {
            Some(value) => parse_flag("SEED_DEMO_DATA", value)?,
            None => false,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port,
            client_url: lookup("CLIENT_URL").filter(|url| !url.is_empty()),
            current_user_name: lookup("CURRENT_USER_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            seed_demo_data,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.port, 3001);
        assert_eq!(config.client_url, None);
        assert_eq!(config.current_user_name, "Kyle");
        assert!(!config.seed_demo_data);
        assert_eq!(config.listen_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("PORT", "8080"),
            ("CLIENT_URL", "http://localhost:3000"),
            ("CURRENT_USER_NAME", "Sally"),
            ("SEED_DEMO_DATA", "true"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 8080);
        assert_eq!(config.client_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.current_user_name, "Sally");
        assert!(config.seed_demo_data);
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn rejects_bad_flag() {
        let err = config_from(&[("SEED_DEMO_DATA", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFlag { name: "SEED_DEMO_DATA", .. }));
    }
}
