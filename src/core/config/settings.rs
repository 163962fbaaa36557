use serde::{Deserialize, Serialize};

/// Typed view over the merged `config.yml` + `secrets.yaml` tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub vector_store: VectorStoreSettings,
    pub agent: AgentSettings,
    pub admin: AdminSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    /// "development" or "production"
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "FlowGuard-Engine".to_string(),
            environment: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub backend: VectorBackend,
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    /// Embedding dimension (1536 for text-embedding-3-small)
    pub dimension: usize,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Qdrant,
            url: "http://qdrant:6333".to_string(),
            api_key: None,
            collection: "kone_manuals".to_string(),
            dimension: 1536,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Passages requested per search query
    pub retrieval_limit: usize,
    /// Rejections tolerated before the run gives up
    pub max_retries: u32,
    /// Overall deadline for one diagnostic run
    pub run_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            retrieval_limit: 2,
            max_retries: 3,
            run_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub api_key: Option<String>,
}
