use thiserror::Error;

/// A frame that could not be decoded into a known shape.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported origin scheme '{0}'; expected http or https")]
    UnsupportedScheme(String),
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unknown wire mode '{0}'; expected json or quantized")]
    UnknownWireMode(String),
    #[error("failed to read config file '{path}': {reason}")]
    File { path: String, reason: String },
}
