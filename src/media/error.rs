use thiserror::Error;

pub type Result<T> = std::result::Result<T, MediaError>;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{tool} could not be started: {source}")]
    NotInstalled {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("could not read image dimensions: {0}")]
    UnreadableDimensions(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
