//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use studybuddy_rag::{RagConfig, Result as RagResult};

/// Ten mebibytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "studybuddy",
    version,
    about = "Upload study PDFs, then chat about them and generate quizzes"
)]
pub struct ServerConfig {
    /// Interface to bind the HTTP server to.
    #[arg(long, env = "STUDYBUDDY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "STUDYBUDDY_PORT", default_value_t = 3001)]
    pub port: u16,

    /// Directory uploaded PDFs are written to.
    #[arg(long, env = "STUDYBUDDY_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Directory for the JSON-lines persistence mirror. Mirroring is off when unset.
    #[arg(long, env = "STUDYBUDDY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Gemini API key. Without one the offline embedder and tutor are used.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini embedding model.
    #[arg(long, env = "STUDYBUDDY_EMBEDDING_MODEL", default_value = "text-embedding-004")]
    pub embedding_model: String,

    /// Gemini generation model.
    #[arg(long, env = "STUDYBUDDY_GENERATION_MODEL", default_value = "gemini-2.0-flash")]
    pub generation_model: String,

    /// Largest accepted upload, in bytes.
    #[arg(long, env = "STUDYBUDDY_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Seconds to wait for a model before falling back.
    #[arg(long, env = "STUDYBUDDY_MODEL_TIMEOUT_SECS", default_value_t = 30)]
    pub model_timeout_secs: u64,

    /// Target chunk length in characters.
    #[arg(long, env = "STUDYBUDDY_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[arg(long, env = "STUDYBUDDY_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Passages retrieved per question.
    #[arg(long, env = "STUDYBUDDY_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Embedding vector length.
    #[arg(long, env = "STUDYBUDDY_DIMENSIONS", default_value_t = 768)]
    pub dimensions: usize,

    /// Chunks embedded concurrently during ingestion.
    #[arg(long, env = "STUDYBUDDY_EMBED_CONCURRENCY", default_value_t = 4)]
    pub embed_concurrency: usize,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "STUDYBUDDY_JSON_LOGS")]
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            upload_dir: PathBuf::from("uploads"),
            data_dir: None,
            gemini_api_key: None,
            embedding_model: "text-embedding-004".to_string(),
            generation_model: "gemini-2.0-flash".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            model_timeout_secs: 30,
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            dimensions: 768,
            embed_concurrency: 4,
            verbose: false,
            json_logs: false,
        }
    }
}

impl ServerConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// The API key, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Validated retrieval settings.
    pub fn rag_config(&self) -> RagResult<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .dimensions(self.dimensions)
            .embed_concurrency(self.embed_concurrency)
            .model_timeout(self.model_timeout())
            .build()
    }
}
