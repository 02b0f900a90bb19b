/// Result alias that carries the custom [`MoodlightError`] type.
pub type Result<T> = std::result::Result<T, MoodlightError>;

/// Common error type for the core crate.
///
/// Only configuration, analyser set-up and inbound message parsing can fail.
/// Feature extraction, mapping and encoding are infallible, and dispatch
/// failures are logged rather than returned.
#[derive(Debug, thiserror::Error)]
pub enum MoodlightError {
    /// Free-form message, mostly surfaced by the command line front-end.
    #[error("{0}")]
    Message(String),
    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A control message had the wrong type tag or no usable payload.
    #[error("malformed control frame: {0}")]
    MalformedFrame(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl MoodlightError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
