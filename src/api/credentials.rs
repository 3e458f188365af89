use std::collections::HashMap;

/// Name under which the completion endpoint credential is stored.
pub const API_KEY_NAME: &str = "openai_api_key";

pub trait CredentialSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Resolves credentials from the process environment, upper-casing the name
/// (`openai_api_key` -> `OPENAI_API_KEY`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name.to_ascii_uppercase())
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

/// In-memory credential store.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn lookup(&self, name: &str) -> Option<String> {
        self.values
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}
