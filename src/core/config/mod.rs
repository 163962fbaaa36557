pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

use thiserror::Error;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{
    AdminSettings, AgentSettings, AppSettings, LlmSettings, ServerSettings, Settings,
    VectorBackend, VectorStoreSettings,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),
}
