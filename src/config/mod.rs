// Configuration management module
// TOML settings for the embedding provider, store location and retrieval defaults

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DEFAULT_TOP_K, EmbeddingConfig, EmbeddingProvider, RetrievalConfig,
    StoreConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
