use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("node {id} not found by key \"{key}\"")]
    NodeNotFound { key: String, id: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Result type alias for helpers in this crate.
pub type CommonResult<T> = std::result::Result<T, CommonError>;
