use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const API_URL_ENV: &str = "LOGCHAT_API_URL";
pub const MODEL_ENV: &str = "LOGCHAT_MODEL";
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: String,
    pub api_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = non_blank_env(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let model = non_blank_env(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self { model, api_url })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid {API_URL_ENV} '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if self.model.trim().is_empty() {
            bail!("Model name must not be empty (set {MODEL_ENV} or pass --model)");
        }

        Ok(())
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_falls_back_to_defaults_for_blank_values() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(API_URL_ENV, "   ");
        std::env::remove_var(MODEL_ENV);

        let config = Config::load().expect("config should load");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.model, DEFAULT_MODEL);

        std::env::remove_var(API_URL_ENV);
    }

    #[test]
    fn test_load_reads_overrides() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(API_URL_ENV, "http://localhost:8000/v1/chat/completions");
        std::env::set_var(MODEL_ENV, "local-model");

        let config = Config::load().expect("config should load");
        assert_eq!(config.api_url, "http://localhost:8000/v1/chat/completions");
        assert_eq!(config.model, "local-model");

        std::env::remove_var(API_URL_ENV);
        std::env::remove_var(MODEL_ENV);
    }
}
