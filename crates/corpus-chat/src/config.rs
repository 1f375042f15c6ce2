use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::embeddings::remote::EmbeddingBackend;
use crate::llm::ProviderKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub chunking: ChunkingConfig,
    pub search: SearchConfig,
    pub session: SessionConfig,
    pub chat: ChatConfig,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub limits: UploadLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Fraction of `chunk_size` shared between consecutive chunks, in [0, 1).
    pub overlap_fraction: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of chunks retrieved per turn.
    pub default_k: usize,
    /// MMR lambda: 1.0 is plain top-k similarity, 0.0 maximizes diversity.
    pub diversity_weight: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are eligible for eviction.
    pub idle_ttl_secs: u64,
    /// How often the background sweeper runs.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Most recent turns included in prompts (reformulation and answering).
    pub history_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub backend: EmbeddingBackend,
    pub model: String,
    pub dimension: usize,
    pub api_key_env: String,
    /// LRU cache entries for query embeddings.
    pub cache_size: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Priority-ordered provider list; the first entry is tried first.
    pub providers: Vec<ProviderSettings>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Per-file byte ceiling for uploads.
    pub max_file_bytes: usize,
}

impl RagConfig {
    /// Validate config values, returning errors for clearly broken
    /// configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunking.chunk_size < 50 {
            return Err("chunking.chunk_size must be >= 50".into());
        }
        if !(0.0..1.0).contains(&self.chunking.overlap_fraction) {
            return Err("chunking.overlap_fraction must be in [0.0, 1.0)".into());
        }
        if self.search.default_k == 0 {
            return Err("search.default_k must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.search.diversity_weight) {
            return Err("search.diversity_weight must be in [0.0, 1.0]".into());
        }
        if self.session.idle_ttl_secs == 0 {
            return Err("session.idle_ttl_secs must be > 0".into());
        }
        if self.chat.history_window == 0 {
            return Err("chat.history_window must be > 0".into());
        }
        if self.embedding.dimension == 0 {
            return Err("embedding.dimension must be > 0".into());
        }
        if self.llm.providers.is_empty() {
            return Err("llm.providers must list at least one provider".into());
        }
        if self.limits.max_file_bytes == 0 {
            return Err("limits.max_file_bytes must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig {
                chunk_size: 1000,
                overlap_fraction: 0.2,
            },
            search: SearchConfig {
                default_k: 5,
                diversity_weight: 0.7,
            },
            session: SessionConfig {
                idle_ttl_secs: 1800,
                sweep_interval_secs: 300,
            },
            chat: ChatConfig { history_window: 10 },
            embedding: EmbeddingSettings {
                backend: EmbeddingBackend::default(),
                model: "text-embedding-004".into(),
                dimension: 768,
                api_key_env: "GOOGLE_API_KEY".into(),
                cache_size: 1000,
                request_timeout_secs: 30,
            },
            llm: LlmSettings {
                providers: vec![
                    ProviderSettings {
                        kind: ProviderKind::Google,
                        model: "gemini-2.0-flash".into(),
                        api_key_env: "GOOGLE_API_KEY".into(),
                    },
                    ProviderSettings {
                        kind: ProviderKind::Groq,
                        model: "openai/gpt-oss-20b".into(),
                        api_key_env: "GROQ_API_KEY".into(),
                    },
                ],
                temperature: 0.0,
                max_tokens: 2048,
                request_timeout_secs: 60,
            },
            limits: UploadLimits {
                max_file_bytes: 10 * 1024 * 1024,
            },
        }
    }
}

/// Resolve an API key from the environment. Looks at the named variable
/// first, then falls back to an `API_KEYS` variable holding a JSON object of
/// key name to value (so one secret can carry all provider keys).
pub fn resolve_api_key(env_name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(env_name) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    let bundle = std::env::var("API_KEYS").ok()?;
    let keys: HashMap<String, String> = serde_json::from_str(&bundle).ok()?;
    keys.get(env_name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = RagConfig::default();
        config.chunking.chunk_size = 10;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.chunking.overlap_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.search.default_k = 0;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.llm.providers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_roundtrip() {
        let config = RagConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = RagConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.chunking.chunk_size, config.chunking.chunk_size);
        assert_eq!(loaded.llm.providers.len(), 2);
    }

    #[test]
    fn from_file_rejects_missing_path() {
        let err = RagConfig::from_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(err.contains("Failed to read"));
    }
}
