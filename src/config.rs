use std::path::PathBuf;

use serde::Deserialize;

use crate::store::EmbeddingLayout;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory the artifact paths are resolved against
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Place directory CSV, relative to `root_dir`
    #[serde(default = "default_places_file")]
    pub places_file: PathBuf,

    /// Embedding table JSON, relative to `root_dir`
    #[serde(default = "default_embeddings_file")]
    pub embeddings_file: PathBuf,

    /// Orientation of the embedding table
    #[serde(default)]
    pub embedding_layout: EmbeddingLayout,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_places_file() -> PathBuf {
    PathBuf::from("serialized/places_final.csv")
}

fn default_embeddings_file() -> PathBuf {
    PathBuf::from("serialized/continuous_embeddings.json")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn places_path(&self) -> PathBuf {
        self.root_dir.join(&self.places_file)
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.root_dir.join(&self.embeddings_file)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
