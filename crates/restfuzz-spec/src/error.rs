//! Loader error types.

use thiserror::Error;

use restfuzz_core::ConfigurationError;

/// Errors that can occur while loading an API description.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be downloaded.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered the download with a non-success status.
    #[error("failed to fetch {url}: HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    /// The text is neither a JSON nor a YAML Swagger document.
    #[error("failed to parse API description: {0}")]
    Parse(String),

    /// The document parsed but describes something unsupported.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl LoadError {
    /// Creates a new parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
