use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FileError>;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("access denied: cannot navigate to '{}'", .0.display())]
    AccessDenied(PathBuf),

    #[error("'{}' is not a valid directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid glob: {0}")]
    InvalidGlob(#[from] globset::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("TIMEOUT: Command execution timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("failed to kill process: {0}")]
    KillFailed(#[source] io::Error),

    #[error("error executing command: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error("Lint failed, edit reverted: {0}")]
    ValidationFailed(String),

    #[error("error replacing given string, string not found: {0:?}")]
    NotFoundInContent(String),
}

impl FileError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Attaches a lazily built message to `std::io` failures, in the spirit of
/// `anyhow::Context::with_context`.
pub trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::result::Result<T, io::Error> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| FileError::io(f(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_context_message() {
        let err: Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "nope"))
            .io_context(|| "Failed to write file: a.txt");
        let err = err.unwrap_err();
        assert_eq!(err.to_string(), "Failed to write file: a.txt: nope");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_is_not_found() {
        assert!(FileError::NotFound(PathBuf::from("/x")).is_not_found());
        let err = FileError::io("read", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_timeout_message() {
        let err = FileError::Timeout { seconds: 120 };
        assert_eq!(
            err.to_string(),
            "TIMEOUT: Command execution timed out after 120 seconds"
        );
    }
}
