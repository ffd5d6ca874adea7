//! CLI error types.

use std::path::PathBuf;

use nancy_config::ConfigError;
use nancy_expand::ExpandError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Expand(#[from] ExpandError),

    #[error("{}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
