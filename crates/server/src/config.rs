use std::path::PathBuf;

use orchestrator::PhaseModels;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_DATABASE_URL: &str = "sqlite://toolbelt.db";
const DEFAULT_CAPABILITY_DIR: &str = "lib/tools";
const DEFAULT_INTERPRETER: &str = "python3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Environment-driven server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to (`TOOLBELT_BIND`)
    pub bind_addr: String,
    /// Model API key (`OPENAI_TOOLBELT_KEY`, required)
    pub api_key: String,
    /// Model API base URL (`TOOLBELT_API_BASE`)
    pub api_base_url: String,
    /// SQLite database URL (`TOOLBELT_DATABASE_URL`)
    pub database_url: String,
    /// Directory synthesized capability sources are written to
    /// (`TOOLBELT_CAPABILITY_DIR`)
    pub capability_dir: PathBuf,
    /// Interpreter used to execute synthesized capabilities
    /// (`TOOLBELT_PYTHON`)
    pub interpreter: String,
    /// Per-phase model selection (`TOOLBELT_*_MODEL`)
    pub models: PhaseModels,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("OPENAI_TOOLBELT_KEY")
            .ok_or(ConfigError::MissingVar("OPENAI_TOOLBELT_KEY"))?;

        let mut models = PhaseModels::default();
        if let Some(model) = lookup("TOOLBELT_PLANNER_MODEL") {
            models.planner = model;
        }
        if let Some(model) = lookup("TOOLBELT_SYNTHESIZER_MODEL") {
            models.synthesizer = model;
        }
        if let Some(model) = lookup("TOOLBELT_INVOKER_MODEL") {
            models.invoker = model;
        }
        if let Some(model) = lookup("TOOLBELT_SUMMARIZER_MODEL") {
            models.summarizer = model;
        }

        Ok(Self {
            bind_addr: lookup("TOOLBELT_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            api_key,
            api_base_url: lookup("TOOLBELT_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            database_url: lookup("TOOLBELT_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            capability_dir: lookup("TOOLBELT_CAPABILITY_DIR")
                .unwrap_or_else(|| DEFAULT_CAPABILITY_DIR.to_string())
                .into(),
            interpreter: lookup("TOOLBELT_PYTHON")
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            models,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("OPENAI_TOOLBELT_KEY", "sk-test")])).unwrap();

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.models.planner, "gpt-5-mini");
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let result = ServerConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingVar(_))));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("OPENAI_TOOLBELT_KEY", "sk-test"),
            ("TOOLBELT_BIND", "0.0.0.0:9000"),
            ("TOOLBELT_PLANNER_MODEL", "gpt-5"),
            ("TOOLBELT_CAPABILITY_DIR", "/tmp/tools"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.models.planner, "gpt-5");
        assert_eq!(config.models.invoker, "gpt-5-nano");
        assert_eq!(config.capability_dir, PathBuf::from("/tmp/tools"));
    }
}
