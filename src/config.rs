//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::chat::DEFAULT_HISTORY_LIMIT;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::persona::PersonaKind;

/// Application configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Which persona this process serves.
    pub app: PersonaKind,
    pub llm: LlmConfig,
    /// libSQL database file for non-anonymous users.
    pub db_path: PathBuf,
    pub port: u16,
    /// Flow document overriding the persona's bundled flow.
    pub flow_path: Option<PathBuf>,
    /// Concierge knowledge document overriding the bundled one.
    pub knowledge_path: Option<PathBuf>,
    /// Chat turns sent to the LLM as history.
    pub history_limit: usize,
    /// Directory for the rolling log file.
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// Load from process environment variables, after reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app = parse_or(&var, "ACTIVE_APP", PersonaKind::PensionGuru)?;
        let backend = parse_or(&var, "INFOBOT_LLM_BACKEND", LlmBackend::OpenAi)?;
        let api_key = var(backend.api_key_var())
            .ok_or_else(|| ConfigError::MissingEnvVar(backend.api_key_var().to_string()))?;
        let model = var("INFOBOT_MODEL").unwrap_or_else(|| backend.default_model().to_string());

        let history_limit = parse_or(&var, "INFOBOT_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?;
        if history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INFOBOT_HISTORY_LIMIT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            app,
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
            },
            db_path: var("INFOBOT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/infobot.db")),
            port: parse_or(&var, "INFOBOT_PORT", 8000)?,
            flow_path: var("INFOBOT_FLOW_PATH").map(PathBuf::from),
            knowledge_path: var("INFOBOT_KNOWLEDGE_PATH").map(PathBuf::from),
            history_limit,
            log_dir: var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs")),
        })
    }
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.app, PersonaKind::PensionGuru);
        assert_eq!(config.llm.backend, LlmBackend::OpenAi);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key.expose_secret(), "sk-test");
        assert_eq!(config.port, 8000);
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.db_path, PathBuf::from("./data/infobot.db"));
        assert!(config.flow_path.is_none());
    }

    #[test]
    fn key_follows_backend() {
        let err = load(&[("INFOBOT_LLM_BACKEND", "anthropic"), ("OPENAI_API_KEY", "sk")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "ANTHROPIC_API_KEY"));

        let config = load(&[
            ("INFOBOT_LLM_BACKEND", "anthropic"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("ACTIVE_APP", "concierge"),
        ])
        .unwrap();
        assert_eq!(config.app, PersonaKind::Concierge);
        assert_eq!(config.llm.model, "claude-3-5-haiku-latest");
    }

    #[test]
    fn invalid_values_name_the_key() {
        let err = load(&[("OPENAI_API_KEY", "sk"), ("INFOBOT_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "INFOBOT_PORT"));

        let err = load(&[("OPENAI_API_KEY", "sk"), ("ACTIVE_APP", "weather")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "ACTIVE_APP"));

        let err = load(&[("OPENAI_API_KEY", "sk"), ("INFOBOT_HISTORY_LIMIT", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("OPENAI_API_KEY", "sk"), ("INFOBOT_PORT", "  ")]).unwrap();
        assert_eq!(config.port, 8000);
    }
}
