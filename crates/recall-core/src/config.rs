//! ============================================================================
//! Config - Environment-driven application settings
//! ============================================================================
//! All settings come from the environment (typically a .env file loaded by
//! the binary). Required values fail fast with the variable name; optional
//! ones fall back to defaults.
//! ============================================================================

use crate::error::{RecallError, Result};
use crate::memory::{
    LlmOptions, LlmSection, MemoryConfig, VectorStoreOptions, VectorStoreSection,
    DEFAULT_COLLECTION_NAME, SUPPORTED_LLM_PROVIDER, SUPPORTED_VECTOR_STORE_PROVIDER,
};

/// Chat and extraction model used when MODEL_CHOICE is unset
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Validated application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Vector store connection string
    pub database_url: String,
    /// Supabase project base URL
    pub supabase_url: String,
    /// Supabase anon API key
    pub supabase_key: String,
    pub openai_api_key: String,
    pub model: String,
    pub collection_name: String,
}

impl AppConfig {
    /// Read and validate configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = require(&get, "DATABASE_URL")?;
        validate_url("DATABASE_URL", &database_url)?;

        let supabase_url = require(&get, "SUPABASE_URL")?;
        validate_url("SUPABASE_URL", &supabase_url)?;

        let supabase_key = require(&get, "SUPABASE_KEY")?;
        let openai_api_key = require(&get, "OPENAI_API_KEY")?;

        let model = optional(&get, "MODEL_CHOICE").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let collection_name = optional(&get, "MEMORY_COLLECTION")
            .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string());

        Ok(Self {
            database_url,
            supabase_url,
            supabase_key,
            openai_api_key,
            model,
            collection_name,
        })
    }

    /// Memory service configuration derived from these settings
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            llm: LlmSection {
                provider: SUPPORTED_LLM_PROVIDER.to_string(),
                config: LlmOptions {
                    model: self.model.clone(),
                },
            },
            vector_store: VectorStoreSection {
                provider: SUPPORTED_VECTOR_STORE_PROVIDER.to_string(),
                config: VectorStoreOptions {
                    connection_string: self.database_url.clone(),
                    collection_name: self.collection_name.clone(),
                },
            },
        }
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RecallError::configuration(format!(
            "{} must be set in the environment",
            key
        ))),
    }
}

fn optional(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    get(key).filter(|value| !value.trim().is_empty())
}

fn validate_url(key: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map_err(|e| RecallError::configuration(format!("{} is not a valid URL: {}", key, e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    const FULL_ENV: &[(&str, &str)] = &[
        ("DATABASE_URL", "http://localhost:6334"),
        ("SUPABASE_URL", "https://abc.supabase.co"),
        ("SUPABASE_KEY", "anon-key"),
        ("OPENAI_API_KEY", "sk-test"),
    ];

    #[test]
    fn complete_environment_parses_with_defaults() {
        let config = AppConfig::from_lookup(lookup(FULL_ENV)).unwrap();

        assert_eq!(config.database_url, "http://localhost:6334");
        assert_eq!(config.supabase_url, "https://abc.supabase.co");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.collection_name, DEFAULT_COLLECTION_NAME);
    }

    #[test]
    fn missing_required_variable_names_it() {
        let env: Vec<(&str, &str)> = FULL_ENV
            .iter()
            .copied()
            .filter(|(name, _)| *name != "OPENAI_API_KEY")
            .collect();

        let err = AppConfig::from_lookup(lookup(&env)).unwrap_err();
        match err {
            RecallError::Configuration(reason) => assert!(reason.contains("OPENAI_API_KEY")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn blank_required_variable_is_rejected() {
        let mut env: Vec<(&str, &str)> = FULL_ENV.to_vec();
        env[2] = ("SUPABASE_KEY", "   ");

        let err = AppConfig::from_lookup(lookup(&env)).unwrap_err();
        assert!(matches!(err, RecallError::Configuration(_)));
    }

    #[test]
    fn malformed_url_is_rejected() {
        let mut env: Vec<(&str, &str)> = FULL_ENV.to_vec();
        env[0] = ("DATABASE_URL", "not a url");

        let err = AppConfig::from_lookup(lookup(&env)).unwrap_err();
        match err {
            RecallError::Configuration(reason) => assert!(reason.contains("DATABASE_URL")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn model_and_collection_overrides_apply() {
        let mut env: Vec<(&str, &str)> = FULL_ENV.to_vec();
        env.push(("MODEL_CHOICE", "gpt-4o"));
        env.push(("MEMORY_COLLECTION", "scratch"));

        let config = AppConfig::from_lookup(lookup(&env)).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.collection_name, "scratch");
    }

    #[test]
    fn memory_config_mirrors_settings() {
        let config = AppConfig::from_lookup(lookup(FULL_ENV)).unwrap();
        let memory_config = config.memory_config();

        assert_eq!(memory_config.llm.provider, SUPPORTED_LLM_PROVIDER);
        assert_eq!(memory_config.llm.config.model, config.model);
        assert_eq!(
            memory_config.vector_store.config.connection_string,
            config.database_url
        );
        assert_eq!(
            memory_config.vector_store.config.collection_name,
            config.collection_name
        );
        assert!(memory_config.validate().is_ok());
    }
}
