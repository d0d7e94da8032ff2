use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: String,
    pub ollama_url: String,
    pub qdrant_url: String,
    pub collection: String,
    pub embed_model: String,
    /// Generation models tried in order; first non-empty parseable answer wins.
    pub models: Vec<String>,
    pub concurrency: ConcurrencyConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Cases processed in parallel per server, across all files.
    pub max_concurrent_cases: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Similar cases fed to the prompt per candidate case.
    pub n_similar: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            qdrant_url: "http://localhost:6333".to_string(),
            collection: "case_corpus".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            models: vec![
                "openhermes:latest".to_string(),
                "mistral:instruct".to_string(),
            ],
            concurrency: ConcurrencyConfig {
                max_concurrent_cases: 4,
            },
            retrieval: RetrievalConfig { n_similar: 3 },
        }
    }
}

impl AppConfig {
    /// Defaults with environment overrides for the deployment-specific bits.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("CASEGRAPH_BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Ok(v) = std::env::var("CASEGRAPH_OLLAMA_URL") {
            config.ollama_url = v;
        }
        if let Ok(v) = std::env::var("CASEGRAPH_QDRANT_URL") {
            config.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("CASEGRAPH_COLLECTION") {
            config.collection = v;
        }
        if let Ok(v) = std::env::var("CASEGRAPH_EMBED_MODEL") {
            config.embed_model = v;
        }
        if let Ok(v) = std::env::var("CASEGRAPH_MODELS") {
            let models: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !models.is_empty() {
                config.models = models;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = AppConfig::default();
        assert!(!config.models.is_empty());
        assert!(config.concurrency.max_concurrent_cases > 0);
        assert!(config.retrieval.n_similar > 0);
    }
}
