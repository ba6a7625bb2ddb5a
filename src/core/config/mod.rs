pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use paths::AppPaths;
pub use service::{parse_app_config, ConfigService};
pub use settings::{
    AppConfig, DistanceMetric, EmbeddingBackend, EmbeddingConfig, LlmBackend, LlmConfig,
    LocalLlmConfig, LoggingConfig, RagConfig, RemoteLlmConfig, SearchConfig, SearchEngine,
    ServerConfig, VectorStoreBackend,
    VectorStoreConfig,
};
