//! Error types shared by the renderer and the command-line front end.

use std::fmt;
use std::io;

/// Everything that can go wrong between argument parsing and the finished
/// PNG.  The core renderer itself is total on well-typed inputs; these
/// variants all originate at the edges (CLI, palette files, numeric
/// literals, the filesystem, the PNG encoder).
#[derive(Debug)]
pub enum RenderError {
    /// A CLI value, palette file, or numeric literal was malformed or out
    /// of its documented range.
    InvalidArgument(String),
    /// A file could not be opened, read, or written.
    Io(io::Error),
    /// The PNG encoder rejected the output.
    Encoding(png::EncodingError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidArgument(msg) => write!(f, "{}", msg),
            RenderError::Io(err) => write!(f, "{}", err),
            RenderError::Encoding(err) => write!(f, "png encoding failed: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::InvalidArgument(_) => None,
            RenderError::Io(err) => Some(err),
            RenderError::Encoding(err) => Some(err),
        }
    }
}

impl From<io::Error> for RenderError {
    fn from(err: io::Error) -> Self {
        RenderError::Io(err)
    }
}

impl From<png::EncodingError> for RenderError {
    fn from(err: png::EncodingError) -> Self {
        RenderError::Encoding(err)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RenderError>;
