//! Error types for loading, generating and saving images.

use std::path::PathBuf;
use std::time::Duration;

/// Longest provider error body shown to the user.
const MAX_ERROR_CHARS: usize = 300;

/// Everything that can go wrong between picking a photo and saving the result.
///
/// None of these are fatal: each one ends up as a message in the status line
/// and the user can fix their input and try again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source file unreadable or destination unwritable.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bytes are not an image we can decode.
    #[error("not a supported image: {0}")]
    Decode(String),

    /// URL field does not hold an http(s) URL.
    #[error("invalid image URL: {0}")]
    InvalidUrl(String),

    /// Re-encoding the result for the chosen file type failed.
    #[error("could not encode image: {0}")]
    Encode(String),

    /// API key missing or rejected by the provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Provider took longer than the client timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Rate limit exceeded.
    #[error("rate limited by provider, try again in a moment")]
    RateLimited,

    /// Account has no credits left.
    #[error("billing: {0}")]
    Billing(String),

    /// Prompt or image rejected by the provider's content policy.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Connection, TLS or body transfer failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response parsed but did not contain an image.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Generate pressed before a photo was loaded.
    #[error("load a source image first")]
    NoSource,

    /// Save pressed before anything was generated.
    #[error("nothing to save yet, generate an image first")]
    NoResult,

    /// A request is already in flight.
    #[error("a generation is already running")]
    Busy,

    /// Settings file or environment could not be parsed.
    #[error("settings: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Background task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for invalid or missing key failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => Self::Encode(e.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}

/// Collapses whitespace and truncates a provider error body for display.
pub fn sanitize_error_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_ERROR_CHARS {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(MAX_ERROR_CHARS).collect();
    truncated.push('…');
    truncated
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
