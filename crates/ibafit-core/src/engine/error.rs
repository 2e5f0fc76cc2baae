use super::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Gene space is empty: nothing to optimize")]
    EmptyGeneSpace,

    #[error("Fit worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
