use std::fmt;

/// Errors that can occur while staging, committing or removing uploads.
#[derive(Debug)]
pub enum StorageError {
    /// An I/O error occurred.
    Io(std::io::Error),
    /// A stored path does not point inside the uploads tree.
    InvalidPath(String),
    /// The upload exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "upload storage IO error: {err}"),
            Self::InvalidPath(path) => write!(f, "invalid upload path: {path}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "upload exceeds size limit ({actual} > {limit} bytes)")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
