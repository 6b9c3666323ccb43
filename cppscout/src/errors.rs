/// Error types for cppscout.
///
/// Only a few of these ever reach the user. Argument and path problems stop the
/// run before any file is scanned, while everything that goes wrong inside a
/// single file (unreadable bytes, a parser that produced no tree, a traversal
/// that aborted) is contained to that file: the scan logs it and moves on.
///
/// ```rust,ignore
/// match processor.process_file(&task) {
///     Ok(result) => sink.write_file(&result)?,
///     Err(SearchError::ParseFailure { path, .. }) => warn!("skipping {}", path.display()),
///     Err(e) => return Err(e),
/// }
/// ```
use std::path::PathBuf;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("'{0}' is not a valid file or directory")]
    InvalidPath(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Unable to parse {path}: {reason}")]
    ParseFailure { path: PathBuf, reason: String },
    #[error("Visiting syntax tree of {path} failed: {reason}")]
    VisitationFailure { path: PathBuf, reason: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_path(path: impl Into<PathBuf>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn parse_failure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn visitation_failure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::VisitationFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Maps an I/O error raised while opening `path` onto the matching variant
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// Errors that should stop the process rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SearchError::InvalidPath(_) | SearchError::InvalidPattern(_) | SearchError::ConfigError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let path = Path::new("main.cpp");
        let err = SearchError::file_not_found(path);
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::permission_denied(path);
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::invalid_path(path);
        assert!(matches!(err, SearchError::InvalidPath(_)));

        let err = SearchError::parse_failure(path, "no tree");
        assert!(matches!(err, SearchError::ParseFailure { .. }));

        let err = SearchError::visitation_failure(path, "cursor lost");
        assert!(matches!(err, SearchError::VisitationFailure { .. }));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::invalid_path("nowhere");
        assert_eq!(err.to_string(), "'nowhere' is not a valid file or directory");

        let err = SearchError::parse_failure("a.cpp", "parser returned no tree");
        assert_eq!(err.to_string(), "Unable to parse a.cpp: parser returned no tree");

        let err = SearchError::invalid_pattern("[unclosed");
        assert_eq!(err.to_string(), "Invalid pattern: [unclosed");

        let err = SearchError::config_error("Missing required field");
        assert_eq!(err.to_string(), "Configuration error: Missing required field");
    }

    #[test]
    fn test_from_io_kinds() {
        let err = SearchError::from_io("a.cpp", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::from_io("a.cpp", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::from_io("a.cpp", io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, SearchError::IoError(_)));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SearchError::invalid_path("x").is_fatal());
        assert!(SearchError::invalid_pattern("[").is_fatal());
        assert!(!SearchError::parse_failure("x", "y").is_fatal());
        assert!(!SearchError::file_not_found("x").is_fatal());
    }
}
