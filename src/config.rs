use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAIConfig,
    pub pinecone: PineconeConfig,
    pub auth: AuthConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub upload_dir: String,
}

#[derive(Clone, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: u32,
    pub chat_model: String,
}

#[derive(Clone, Deserialize)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_host: String,
    pub namespace: Option<String>,
    pub api_version: String,
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

// Secrets stay out of the startup log.
impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("chat_model", &self.chat_model)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("index_host", &self.index_host)
            .field("namespace", &self.namespace)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig").finish_non_exhaustive()
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3001".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "data".to_string()),
            },
            openai: OpenAIConfig {
                api_key: required("OPENAI_API_KEY")?,
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                embedding_model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                embedding_dimensions: env::var("EMBEDDING_DIMENSIONS")
                    .unwrap_or_else(|_| "1024".to_string())
                    .parse()
                    .context("EMBEDDING_DIMENSIONS must be an integer")?,
                chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            },
            pinecone: PineconeConfig {
                api_key: required("PINECONE_API_KEY")?,
                index_host: required("PINECONE_INDEX_HOST")?,
                namespace: env::var("PINECONE_NAMESPACE").ok().filter(|s| !s.is_empty()),
                api_version: env::var("PINECONE_API_VERSION")
                    .unwrap_or_else(|_| "2024-07".to_string()),
            },
            auth: AuthConfig {
                admin_password: required("ADMIN_PASSWORD")?,
            },
            retrieval: RetrievalConfig {
                top_k: env::var("RETRIEVAL_TOP_K")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("RETRIEVAL_TOP_K must be an integer")?,
            },
        })
    }

    /// Defaults used by tests and local tooling; keys are placeholders.
    pub fn for_testing(admin_password: &str, upload_dir: &str) -> Self {
        Self {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
                cors_allowed_origins: vec!["*".to_string()],
                upload_dir: upload_dir.to_string(),
            },
            openai: OpenAIConfig {
                api_key: "test-key".to_string(),
                base_url: "http://127.0.0.1".to_string(),
                embedding_model: "text-embedding-3-small".to_string(),
                embedding_dimensions: 1024,
                chat_model: "gpt-4o".to_string(),
            },
            pinecone: PineconeConfig {
                api_key: "test-key".to_string(),
                index_host: "http://127.0.0.1".to_string(),
                namespace: None,
                api_version: "2024-07".to_string(),
            },
            auth: AuthConfig {
                admin_password: admin_password.to_string(),
            },
            retrieval: RetrievalConfig { top_k: 30 },
        }
    }
}
