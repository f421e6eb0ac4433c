//! Error handling for the meisencam crate.

/// Result type alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for a capture cycle.
///
/// There is no retry or recovery machinery: a failed cycle aborts and the
/// top-level caller logs the error. A missing reference image is NOT an
/// error (it is the baseline-initialisation case handled by the scorer).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The camera subprocess could not be spawned or exited unsuccessfully.
    #[error("camera failure: {0}")]
    Camera(String),

    /// Image decode or encode error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP error during upload.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
