use geomatrix_io::DataLoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// A source could not be read, decoded or parsed.
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    /// The requested name is not in the master table.
    #[error("feature not found: '{name}'")]
    FeatureNotFound { name: String },

    /// TOML parse or validation error in the reconciler config.
    #[error("config error: {0}")]
    Config(String),
}
