use std::{error, fmt, io};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by pointil.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    MediaFileNotFound,
    MediaFileProbeError,
    AudioDecodingError(Box<dyn error::Error + Send + Sync>),
    ParameterError(String),
    SnapshotError(String),
    SendError(String),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MediaFileNotFound => write!(f, "Audio file not found or has no audio track"),
            Self::MediaFileProbeError => write!(f, "Audio file failed to probe"),
            Self::AudioDecodingError(err) => err.fmt(f),
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::SnapshotError(str) => write!(f, "Invalid parameter snapshot: {str}"),
            Self::SendError(str) => write!(f, "Failed to send engine message: {str}"),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::SnapshotError(err.to_string())
    }
}

impl From<symphonia::core::errors::Error> for Error {
    fn from(err: symphonia::core::errors::Error) -> Error {
        Error::AudioDecodingError(Box::new(err))
    }
}
