//! Application configuration, loaded from environment variables.

use config::{Config as ConfigLoader, ConfigError, Environment};
use serde::Deserialize;

fn default_api_port() -> u16 {
    8789
}

fn default_worker_poll_interval_ms() -> u64 {
    3000
}

fn default_upload_origin() -> String {
    "http://localhost:8789".to_string()
}

/// All `HOME_INVENTORY_*` settings, loaded flat (the env vars are not
/// grouped into nested sections) via `Environment::with_prefix`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    pub worker_token: Option<String>,
    #[serde(default = "default_upload_origin")]
    pub upload_origin: String,
    pub api_base_url: Option<String>,
    #[serde(default = "default_worker_poll_interval_ms")]
    pub worker_poll_interval_ms: u64,

    pub llm_provider: Option<String>,
    pub llm_base_url: Option<String>,
    pub planner_model: Option<String>,
    pub extractor_model: Option<String>,
    pub llm_request_mode: Option<String>,
    pub openrouter_site_url: Option<String>,
    pub openrouter_app_name: Option<String>,

    /// Provider API keys don't carry the `HOME_INVENTORY_` prefix, so
    /// they are read separately in [`Config::load`] rather than through
    /// the prefixed `Environment` source.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
}

impl Config {
    /// Loads every `HOME_INVENTORY_*` env var, then overlays the
    /// unprefixed provider API keys.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder()
            .set_default("api_port", default_api_port())?
            .set_default("upload_origin", default_upload_origin())?
            .set_default("worker_poll_interval_ms", default_worker_poll_interval_ms())?
            .add_source(
                Environment::with_prefix("HOME_INVENTORY")
                    .separator("__")
                    .try_parsing(true),
            );
        let mut config: Config = builder.build()?.try_deserialize()?;

        config.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        config.openrouter_api_key = std::env::var("OPENROUTER_API_KEY").ok();
        config.gemini_api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok();

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_unset() {
        // SAFETY: test runs single-threaded within this process's env;
        // no other test in this crate reads HOME_INVENTORY_API_PORT.
        unsafe {
            std::env::remove_var("HOME_INVENTORY_API_PORT");
        }
        let config = Config::load().unwrap();
        assert_eq!(config.api_port, 8789);
        assert_eq!(config.worker_poll_interval_ms, 3000);
    }
}
