use thiserror::Error;

/// Failure conditions of the consultation pipeline.
///
/// Every variant leaves the pipeline in an interactive state; none is fatal
/// to the process. `Service` carries the server-supplied message verbatim so
/// the controller can display it unchanged.
#[derive(Debug, Error)]
pub enum ConsultError {
    /// Microphone access refused or no input device present. Recoverable:
    /// the user can stage a file instead.
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// Submission attempted with neither audio nor image staged. Rejected
    /// locally, no network call is made.
    #[error("nothing staged for submission")]
    MissingInput,

    /// Network-level failure (connect, timeout, malformed response body).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status and a structured message.
    #[error("{message}")]
    Service { message: String },

    /// Audio codec failure: malformed base64, an undecodable payload, or a
    /// clip that could not be finalized.
    #[error("audio codec failure: {0}")]
    Decode(String),

    /// Output device failure while starting playback.
    #[error("playback failed: {0}")]
    Playback(String),
}

impl ConsultError {
    /// Message suitable for direct display to the user.
    pub fn display_message(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, ConsultError>;
