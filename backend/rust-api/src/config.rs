use serde::Deserialize;
use std::env;

use crate::models::question::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub questions_path: Option<String>,
    pub default_mode: String,
    pub default_difficulty: Difficulty,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            questions_path: None,
            default_mode: "adaptive".to_string(),
            default_difficulty: Difficulty::new(3),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml + ENV overrides (prefix: APP_)
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Self::from_settings(&settings)
    }

    fn from_settings(settings: &config::Config) -> Result<Self, config::ConfigError> {
        let defaults = Config::default();

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let questions_path = settings
            .get_string("quiz.questions_path")
            .ok()
            .or_else(|| env::var("QUESTIONS_PATH").ok())
            .filter(|path| !path.trim().is_empty());

        let default_mode = settings
            .get_string("quiz.default_mode")
            .map(|mode| mode.trim().to_lowercase())
            .unwrap_or(defaults.default_mode);

        // Raw value may be a string or an integer; anything unusable lands on 1
        let default_difficulty = match settings.get::<serde_json::Value>("quiz.default_difficulty") {
            Ok(raw) => Difficulty::from_raw(&raw),
            Err(config::ConfigError::NotFound(_)) => defaults.default_difficulty,
            Err(e) => {
                tracing::warn!("Ignoring unreadable quiz.default_difficulty: {}", e);
                Difficulty::MIN
            }
        };

        let log_format = match settings.get_string("logging.format") {
            Ok(value) => match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(config::ConfigError::Message(format!(
                        "Unknown logging.format: {}",
                        other
                    )))
                }
            },
            Err(_) => defaults.log_format,
        };

        Ok(Config {
            bind_addr,
            questions_path,
            default_mode,
            default_difficulty,
            log_format,
        })
    }
}
